//! Rebuilds subtotal records from the flat grid.
//!
//! Breakdown grids print a heading row (no amount) when a service, programme
//! or economic heading starts, and the heading's total only on a later row
//! that looks like any other data row. Nothing marks where a block ends: the
//! reconciler keeps a stack of open contexts and infers each close from how
//! the row's keys compare with the innermost open context.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::breakdown::grid_normalize::NormalizedRow;
use crate::error::{BreakdownError, Result};
use crate::model::{ItemKind, Level, LineItem};

/// Hierarchy keys in force while a context is open. Empty means unset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextKeys {
    pub service: String,
    pub programme: String,
    pub expense_concept: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenContext {
    pub level: Level,
    pub key: String,
    /// Heading text; `None` for contexts opened implicitly by a data row.
    pub description: Option<String>,
    /// Emitted instead of `description` when set.
    pub label: Option<String>,
    pub keys: ContextKeys,
    leaf_total: Decimal,
    leaf_count: usize,
}

impl OpenContext {
    /// The whole-document context. It has no opening row, so callers seed it
    /// before reconciliation; the grid's final row closes it.
    pub fn root(section: impl Into<String>, description: Option<String>) -> Self {
        Self {
            level: Level::Root,
            key: section.into(),
            description,
            label: None,
            keys: ContextKeys::default(),
            leaf_total: Decimal::ZERO,
            leaf_count: 0,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.keys.service = service.into();
        self
    }

    pub fn with_programme(mut self, programme: impl Into<String>) -> Self {
        self.keys.programme = programme.into();
        self
    }

    fn child(
        &self,
        level: Level,
        key: &str,
        description: Option<String>,
        label: Option<String>,
    ) -> Self {
        let mut keys = self.keys.clone();
        match level {
            Level::Root => {}
            Level::Service => keys.service = key.to_string(),
            Level::Programme => keys.programme = key.to_string(),
            Level::Concept(_) => keys.expense_concept = key.to_string(),
        }

        Self {
            level,
            key: key.to_string(),
            description,
            label,
            keys,
            leaf_total: Decimal::ZERO,
            leaf_count: 0,
        }
    }
}

pub struct ReconcileScope<'a> {
    pub filename: &'a str,
    pub year: u16,
    pub section: &'a str,
    /// Fail when a subtotal differs from the sum of the leaves it closes.
    pub validate_subtotals: bool,
}

pub fn reconcile(
    rows: &[NormalizedRow],
    root: OpenContext,
    scope: ReconcileScope<'_>,
) -> Result<Vec<LineItem>> {
    let mut reconciler = SubtotalReconciler::new(scope, root);
    for (index, row) in rows.iter().enumerate() {
        reconciler.push_row(index, row)?;
    }
    reconciler.finish()
}

pub struct SubtotalReconciler<'a> {
    scope: ReconcileScope<'a>,
    stack: Vec<OpenContext>,
    // Keys of closed contexts. The grid keeps carrying them on the rows that
    // follow the close, where they must read as blank. A printed key is never
    // stale.
    stale_service: Option<String>,
    stale_programme: Option<String>,
    items: Vec<LineItem>,
    last_row: Option<(usize, String)>,
}

impl<'a> SubtotalReconciler<'a> {
    pub fn new(scope: ReconcileScope<'a>, root: OpenContext) -> Self {
        Self {
            scope,
            stack: vec![root],
            stale_service: None,
            stale_programme: None,
            items: Vec::new(),
            last_row: None,
        }
    }

    pub fn open_contexts(&self) -> &[OpenContext] {
        &self.stack
    }

    pub fn push_row(&mut self, index: usize, row: &NormalizedRow) -> Result<()> {
        self.last_row = Some((index, row.description.clone()));
        if self.stack.is_empty() {
            return Err(self.fault(index, row, "row follows the document total".to_string()));
        }

        let service = live_key(&row.service, row.opens_service, self.stale_service.as_deref());
        let programme = live_key(
            &row.programme,
            row.opens_programme,
            self.stale_programme.as_deref(),
        );
        let concept = row.expense_concept.as_str();

        let Some(amount) = row.amount else {
            return self.open_heading(index, row, service, programme, concept);
        };

        let opened = self.open_new_identifiers(index, row, service, programme, false)?;
        if opened || !concept.is_empty() {
            self.emit_leaf(row, amount);
            return Ok(());
        }

        self.close_or_leaf(index, row, service, programme, amount)
    }

    pub fn finish(self) -> Result<Vec<LineItem>> {
        if self.stack.len() > 1 {
            let (row_index, row) = self.last_row.clone().unwrap_or_default();
            let open = self
                .stack
                .iter()
                .skip(1)
                .map(|context| format!("{}:{}", context.level.as_str(), context.key))
                .collect::<Vec<String>>()
                .join(", ");
            let error = BreakdownError::Reconciliation {
                filename: self.scope.filename.to_string(),
                row_index,
                row,
                reason: format!("contexts still open at end of document: {}", open),
            };
            warn!(error = %error, "reconciliation failed");
            return Err(error);
        }

        if self.stack.len() == 1 {
            warn!(filename = %self.scope.filename, "document ended without a closing total row");
        }

        let subtotals = self.items.iter().filter(|item| item.is_subtotal()).count();
        info!(
            filename = %self.scope.filename,
            leaves = self.items.len() - subtotals,
            subtotals,
            "reconciled line items"
        );
        Ok(self.items)
    }

    fn top(&self) -> &OpenContext {
        // push_row rejects rows once the stack is empty.
        &self.stack[self.stack.len() - 1]
    }

    fn open_heading(
        &mut self,
        index: usize,
        row: &NormalizedRow,
        service: &str,
        programme: &str,
        concept: &str,
    ) -> Result<()> {
        if !concept.is_empty() {
            self.open_new_identifiers(index, row, service, programme, false)?;
            let level = Level::Concept(concept.chars().count().min(u8::MAX as usize) as u8);
            return self.push_context(
                index,
                row,
                level,
                concept,
                Some(row.description.clone()),
                row.subtotal_label.clone(),
            );
        }

        if self.open_new_identifiers(index, row, service, programme, true)? {
            return Ok(());
        }
        Err(self.fault(index, row, "heading row opens no new context".to_string()))
    }

    /// Opens a context for every service/programme identifier the row brings
    /// that is not already open. With `heading` set, the finest new context
    /// takes the row's description as its heading text.
    fn open_new_identifiers(
        &mut self,
        index: usize,
        row: &NormalizedRow,
        service: &str,
        programme: &str,
        heading: bool,
    ) -> Result<bool> {
        let path = self.top().keys.clone();
        let mut pending = Vec::<(Level, &str)>::new();

        if !service.is_empty() && service != path.service {
            if !path.service.is_empty() {
                return Err(self.fault(
                    index,
                    row,
                    format!("service {} starts while service {} is open", service, path.service),
                ));
            }
            pending.push((Level::Service, service));
        }
        if !programme.is_empty() && programme != path.programme {
            if !path.programme.is_empty() {
                return Err(self.fault(
                    index,
                    row,
                    format!(
                        "programme {} starts while programme {} is open",
                        programme, path.programme
                    ),
                ));
            }
            pending.push((Level::Programme, programme));
        }

        let count = pending.len();
        for (position, (level, key)) in pending.into_iter().enumerate() {
            let finest = position + 1 == count;
            let description = if finest && heading {
                Some(row.description.clone())
            } else {
                None
            };
            let label = if finest { row.subtotal_label.clone() } else { None };
            self.push_context(index, row, level, key, description, label)?;
        }

        Ok(count > 0)
    }

    fn push_context(
        &mut self,
        index: usize,
        row: &NormalizedRow,
        level: Level,
        key: &str,
        description: Option<String>,
        label: Option<String>,
    ) -> Result<()> {
        let top = self.top();
        if level <= top.level {
            return Err(self.fault(
                index,
                row,
                format!(
                    "{} {} opens inside {} {}",
                    level.as_str(),
                    key,
                    top.level.as_str(),
                    top.key
                ),
            ));
        }
        if matches!(top.level, Level::Concept(_)) && !key.starts_with(top.key.as_str()) {
            return Err(self.fault(
                index,
                row,
                format!("concept {} opens while concept {} is open", key, top.key),
            ));
        }

        let context = top.child(level, key, description, label);
        if level == Level::Service {
            self.stale_programme = None;
        }
        self.stack.push(context);
        Ok(())
    }

    fn close_or_leaf(
        &mut self,
        index: usize,
        row: &NormalizedRow,
        service: &str,
        programme: &str,
        amount: Decimal,
    ) -> Result<()> {
        let top = self.top();
        // A context opened by a data row has no heading to repeat, so the first
        // row that only carries its key is its total.
        let implicit = top.description.is_none();
        let shallower = match top.level {
            // Only the whole-document total is left to close.
            Level::Root => true,
            Level::Service => service.is_empty() || (implicit && !row.opens_service),
            Level::Programme => programme.is_empty() || (implicit && !row.opens_programme),
            Level::Concept(_) => true,
        };
        if shallower {
            return self.close_top(index, row, amount);
        }

        // Same keys as the innermost context: a closing row repeats the heading
        // of the context it closes, a leaf does not.
        let matched = self
            .stack
            .iter()
            .rposition(|context| context.description.as_deref() == Some(row.description.as_str()));
        match matched {
            Some(position) if position + 1 == self.stack.len() => {
                self.close_top(index, row, amount)
            }
            Some(position) => Err(self.fault(
                index,
                row,
                format!(
                    "closes {} {} while {} inner context(s) are open",
                    self.stack[position].level.as_str(),
                    self.stack[position].key,
                    self.stack.len() - position - 1
                ),
            )),
            None => {
                self.emit_leaf(row, amount);
                Ok(())
            }
        }
    }

    fn close_top(&mut self, index: usize, row: &NormalizedRow, amount: Decimal) -> Result<()> {
        let top = self.top();
        if self.scope.validate_subtotals && top.leaf_count > 0 && top.leaf_total != amount {
            return Err(self.fault(
                index,
                row,
                format!(
                    "subtotal {} of {} {} differs from its leaf sum {}",
                    amount,
                    top.level.as_str(),
                    top.key,
                    top.leaf_total
                ),
            ));
        }

        let Some(context) = self.stack.pop() else {
            return Err(self.fault(index, row, "no open context to close".to_string()));
        };
        // A heading printed without any breakdown stands in for a leaf of the
        // contexts around it.
        if context.leaf_count == 0 {
            for outer in &mut self.stack {
                outer.leaf_total += amount;
                outer.leaf_count += 1;
            }
        }
        match context.level {
            Level::Service => self.stale_service = Some(context.key.clone()),
            Level::Programme => self.stale_programme = Some(context.key.clone()),
            Level::Root | Level::Concept(_) => {}
        }

        let description = context
            .label
            .or(context.description)
            .unwrap_or_else(|| row.description.clone());
        self.items.push(LineItem {
            year: self.scope.year,
            section: self.scope.section.to_string(),
            service: non_blank(&context.keys.service),
            programme: non_blank(&context.keys.programme),
            expense_concept: non_blank(&context.keys.expense_concept),
            description,
            amount,
            kind: ItemKind::Subtotal {
                level: context.level,
            },
        });
        Ok(())
    }

    fn emit_leaf(&mut self, row: &NormalizedRow, amount: Decimal) {
        for context in &mut self.stack {
            context.leaf_total += amount;
            context.leaf_count += 1;
        }

        let path = &self.top().keys;
        let item = LineItem {
            year: self.scope.year,
            section: self.scope.section.to_string(),
            service: non_blank(&path.service),
            programme: non_blank(&path.programme),
            expense_concept: non_blank(&row.expense_concept),
            description: row.description.clone(),
            amount,
            kind: ItemKind::Leaf,
        };
        self.items.push(item);
    }

    fn fault(&self, index: usize, row: &NormalizedRow, reason: String) -> BreakdownError {
        let error = BreakdownError::Reconciliation {
            filename: self.scope.filename.to_string(),
            row_index: index,
            row: row.description.clone(),
            reason,
        };
        warn!(error = %error, "reconciliation failed");
        error
    }
}

fn live_key<'r>(value: &'r str, printed: bool, stale: Option<&str>) -> &'r str {
    if !printed && stale == Some(value) {
        ""
    } else {
        value
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
