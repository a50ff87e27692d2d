use crate::breakdown::grid_normalize::NormalizedRow;
use crate::model::{Category, Institution};

/// Header facts the institutional tree is built from, as scraped or taken
/// from the filename.
pub struct InstitutionSource<'a> {
    pub category: Category,
    pub section: &'a str,
    pub section_name: Option<String>,
    pub entity: Option<&'a str>,
    pub entity_name: Option<String>,
}

/// Naming hierarchy of a breakdown: its section, then the services it
/// describes. Amounts play no part.
pub fn collect_institutions(
    source: &InstitutionSource<'_>,
    rows: &[NormalizedRow],
) -> Vec<Institution> {
    let mut institutions = vec![Institution {
        section: source.section.to_string(),
        service: None,
        description: source.section_name.clone(),
    }];

    match source.category {
        Category::StateEntity | Category::Programme => {
            for row in rows.iter().filter(|row| row.opens_service) {
                let already_listed = institutions.iter().any(|institution| {
                    institution.service.as_deref() == Some(row.service.as_str())
                });
                if already_listed {
                    continue;
                }
                institutions.push(Institution {
                    section: source.section.to_string(),
                    service: Some(row.service.clone()),
                    description: row.service_name.clone(),
                });
            }
        }
        Category::NonStateEntity | Category::Income => {
            if let Some(entity) = source.entity {
                institutions.push(Institution {
                    section: source.section.to_string(),
                    service: Some(entity.to_string()),
                    description: source.entity_name.clone(),
                });
            }
        }
    }

    institutions
}
