//! Static profession knowledge: groups of related professions, informal
//! aliases and the relations between groups.
//!
//! Declaration order matters. Resolution breaks ties by the first group and
//! member encountered, so groups and their members are kept in `Vec`s.

use crate::utils::error::{ReliefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionGroup {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionAlias {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRelation {
    pub category: String,
    pub related: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionCatalog {
    #[serde(default)]
    pub groups: Vec<ProfessionGroup>,
    #[serde(default)]
    pub aliases: Vec<ProfessionAlias>,
    #[serde(default)]
    pub relations: Vec<CategoryRelation>,
}

fn group(name: &str, members: &[&str]) -> ProfessionGroup {
    ProfessionGroup {
        name: name.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

fn alias(canonical: &str, synonyms: &[&str]) -> ProfessionAlias {
    ProfessionAlias {
        canonical: canonical.to_string(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

fn relation(category: &str, related: &[&str]) -> CategoryRelation {
    CategoryRelation {
        category: category.to_string(),
        related: related.iter().map(|r| r.to_string()).collect(),
    }
}

impl Default for ProfessionCatalog {
    fn default() -> Self {
        Self {
            groups: vec![
                group(
                    "IT_Digital",
                    &[
                        "IT Consultant",
                        "Software Developer",
                        "Software Engineer",
                        "Programmer",
                        "Web Developer",
                        "DevOps Engineer",
                        "Data Scientist",
                    ],
                ),
                group(
                    "Medical_Healthcare",
                    &[
                        "Doctor",
                        "Physician",
                        "Surgeon",
                        "Medical Practitioner",
                        "GP",
                        "Nurse",
                        "Paramedic",
                        "Dentist",
                        "Pharmacist",
                    ],
                ),
                group(
                    "Construction_Trades",
                    &[
                        "Construction Worker",
                        "Builder",
                        "Carpenter",
                        "Electrician",
                        "Plumber",
                        "Bricklayer",
                        "Plasterer",
                        "Site Manager",
                    ],
                ),
                group(
                    "Creative_Media",
                    &[
                        "Artist",
                        "Graphic Designer",
                        "UI Designer",
                        "Photographer",
                        "Illustrator",
                        "Musician",
                        "Journalist",
                    ],
                ),
                group(
                    "Education",
                    &[
                        "Teacher",
                        "Lecturer",
                        "Professor",
                        "Teaching Assistant",
                        "Tutor",
                    ],
                ),
                group(
                    "Hospitality_Catering",
                    &["Chef", "Cook", "Kitchen Porter", "Waiter", "Bartender"],
                ),
                group(
                    "Scientific_Research",
                    &[
                        "Research Scientist",
                        "Laboratory Technician",
                        "Chemist",
                        "Biologist",
                    ],
                ),
                group(
                    "Transport_Logistics",
                    &["Lorry Driver", "Delivery Driver", "Pilot", "Cabin Crew"],
                ),
                group(
                    "Emergency_Services",
                    &["Police Officer", "Firefighter", "Prison Officer"],
                ),
            ],
            aliases: vec![
                alias(
                    "Software Engineer",
                    &["software dev", "swe", "coder", "backend engineer", "frontend engineer"],
                ),
                alias("Web Developer", &["web dev", "web designer"]),
                alias("Doctor", &["medic", "junior doctor", "registrar"]),
                alias("GP", &["general practitioner", "family doctor"]),
                alias("Nurse", &["staff nurse", "registered nurse", "rn"]),
                alias("Builder", &["construction", "labourer", "laborer"]),
                alias("Electrician", &["sparky", "sparks"]),
                alias("Plumber", &["heating engineer", "gas engineer"]),
                alias("Teacher", &["school teacher", "schoolteacher", "educator"]),
                alias("Chef", &["head chef", "sous chef", "line cook", "commis chef"]),
                alias("Lorry Driver", &["hgv driver", "trucker", "truck driver"]),
                alias("Police Officer", &["police", "cop", "constable"]),
                alias("Firefighter", &["fireman", "firefighter crew"]),
                alias("Research Scientist", &["scientist", "researcher"]),
            ],
            relations: vec![
                relation("Scientific_Research", &["Medical_Healthcare", "Education"]),
                relation("Medical_Healthcare", &["Scientific_Research"]),
                relation("IT_Digital", &["Creative_Media"]),
                relation("Creative_Media", &["IT_Digital"]),
                relation("Construction_Trades", &["Transport_Logistics"]),
                relation("Hospitality_Catering", &[]),
            ],
        }
    }
}

impl ProfessionCatalog {
    /// Rejects catalogs a resolver could not answer deterministically.
    pub fn validate(&self) -> Result<()> {
        let mut seen_groups: Vec<&str> = Vec::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ReliefError::ConfigValidationError {
                    field: "professions.groups.name".to_string(),
                    message: "Group name cannot be empty".to_string(),
                });
            }
            if seen_groups.iter().any(|g| g.eq_ignore_ascii_case(&group.name)) {
                return Err(ReliefError::ConfigValidationError {
                    field: "professions.groups.name".to_string(),
                    message: format!("Group '{}' is declared twice", group.name),
                });
            }
            seen_groups.push(&group.name);
        }

        self.synonym_index()?;

        for relation in &self.relations {
            for related in &relation.related {
                if !self.groups.iter().any(|g| g.name == *related) {
                    return Err(ReliefError::ConfigValidationError {
                        field: "professions.relations.related".to_string(),
                        message: format!(
                            "'{}' relates to unknown category '{}'",
                            relation.category, related
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Lowercased synonym to canonical label. A synonym listed under two
    /// different canonical labels is an error.
    pub fn synonym_index(&self) -> Result<HashMap<String, String>> {
        let mut index: HashMap<String, String> = HashMap::new();
        for entry in &self.aliases {
            for synonym in &entry.synonyms {
                let key = synonym.trim().to_lowercase();
                match index.get(&key) {
                    Some(existing) if !existing.eq_ignore_ascii_case(&entry.canonical) => {
                        return Err(ReliefError::AmbiguousAliasError {
                            alias: synonym.clone(),
                            first: existing.clone(),
                            second: entry.canonical.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        index.insert(key, entry.canonical.clone());
                    }
                }
            }
        }
        Ok(index)
    }

    pub fn group(&self, name: &str) -> Option<&ProfessionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn related_categories(&self, category: &str) -> &[String] {
        self.relations
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.related.as_slice())
            .unwrap_or(&[])
    }

    /// Every member of every group, first occurrence wins.
    pub fn all_members(&self) -> Vec<&str> {
        let mut members: Vec<&str> = Vec::new();
        for group in &self.groups {
            for member in &group.members {
                if !members.contains(&member.as_str()) {
                    members.push(member);
                }
            }
        }
        members
    }
}
