use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DekhoError;

pub const DEFAULT_LEAD_SOURCE: &str = "website";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

/// Lead form submission as posted by the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub current_situation: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub initial_query: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub interested_college_slug: Option<String>,
    #[serde(default)]
    pub interested_course_slug: Option<String>,
    #[serde(default)]
    pub interested_exam_slug: Option<String>,
}

/// A validated lead ready to be inserted. Blank optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub current_situation: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub initial_query: Option<String>,
    pub source: String,
    pub interested_college_slug: Option<String>,
    pub interested_course_slug: Option<String>,
    pub interested_exam_slug: Option<String>,
}

/// A stored lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub current_situation: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub initial_query: Option<String>,
    pub source: String,
    pub interested_college_slug: Option<String>,
    pub interested_course_slug: Option<String>,
    pub interested_exam_slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn from_new(id: Uuid, lead: NewLead, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            current_situation: lead.current_situation,
            city: lead.city,
            state: lead.state,
            initial_query: lead.initial_query,
            source: lead.source,
            interested_college_slug: lead.interested_college_slug,
            interested_course_slug: lead.interested_course_slug,
            interested_exam_slug: lead.interested_exam_slug,
            created_at,
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Digits of a phone number once `+`, spaces, dashes and brackets are removed.
/// Any other character makes the number invalid.
fn phone_digits(phone: &str) -> Option<String> {
    let mut digits = String::new();
    for c in phone.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '+' | ' ' | '-' | '(' | ')' => {}
            _ => return None,
        }
    }
    Some(digits)
}

impl LeadSubmission {
    pub fn validate(self) -> Result<NewLead, DekhoError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DekhoError::validation("name is required"));
        }

        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            return Err(DekhoError::validation("phone is required"));
        }
        match phone_digits(&phone) {
            Some(d) if (10..=15).contains(&d.len()) => {}
            _ => return Err(DekhoError::validation("phone must have 10 to 15 digits")),
        }

        let email = clean(self.email);
        if let Some(email) = &email {
            if !EMAIL_RE.is_match(email) {
                return Err(DekhoError::validation("email is not valid"));
            }
        }

        Ok(NewLead {
            name,
            email,
            phone,
            current_situation: clean(self.current_situation),
            city: clean(self.city),
            state: clean(self.state),
            initial_query: clean(self.initial_query),
            source: clean(self.source).unwrap_or_else(|| DEFAULT_LEAD_SOURCE.to_string()),
            interested_college_slug: clean(self.interested_college_slug),
            interested_course_slug: clean(self.interested_course_slug),
            interested_exam_slug: clean(self.interested_exam_slug),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, phone: &str) -> LeadSubmission {
        LeadSubmission {
            name: name.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_lead_has_null_email_and_default_source() {
        let lead = submission("Asha", "9999999999").validate().unwrap();
        assert_eq!(lead.name, "Asha");
        assert_eq!(lead.email, None);
        assert_eq!(lead.source, DEFAULT_LEAD_SOURCE);
    }

    #[test]
    fn missing_name_or_phone_is_rejected() {
        assert!(submission("  ", "9999999999").validate().is_err());
        assert!(submission("Asha", "").validate().is_err());
    }

    #[test]
    fn phone_accepts_formatting() {
        assert!(submission("Asha", "+91 98765-43210").validate().is_ok());
        assert!(submission("Asha", "(022) 2345 6789").validate().is_ok());
    }

    #[test]
    fn phone_rejects_letters_and_short_numbers() {
        assert!(submission("Asha", "98765abcde").validate().is_err());
        assert!(submission("Asha", "12345").validate().is_err());
    }

    #[test]
    fn blank_optionals_become_none() {
        let mut s = submission("Ravi", "9876543210");
        s.email = Some("   ".to_string());
        s.city = Some(" Jaipur ".to_string());
        s.interested_exam_slug = Some(String::new());

        let lead = s.validate().unwrap();
        assert_eq!(lead.email, None);
        assert_eq!(lead.city.as_deref(), Some("Jaipur"));
        assert_eq!(lead.interested_exam_slug, None);
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut s = submission("Ravi", "9876543210");
        s.email = Some("ravi@".to_string());
        assert!(s.validate().is_err());

        let mut ok = submission("Ravi", "9876543210");
        ok.email = Some("ravi@example.in".to_string());
        assert_eq!(ok.validate().unwrap().email.as_deref(), Some("ravi@example.in"));
    }
}
