//! Typed partial updates. A `None` field leaves the target untouched, so applying a
//! patch merges into the existing sub-tree instead of replacing it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use super::domain::{
    Consents, DayAvailability, Education, EmergencyContact, Experience, LanguageSkill,
    PersonalInfo, ProfessionalBackground, Reference, SubjectLevel, SubjectToTeach,
    TeachingExperience, TeachingInformation, Weekday,
};

fn assign<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfoPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub languages_spoken: Option<Vec<LanguageSkill>>,
    pub emergency_contact: Option<EmergencyContactPatch>,
}

impl PersonalInfoPatch {
    pub fn apply(self, info: &mut PersonalInfo) {
        assign(&mut info.first_name, self.first_name);
        assign(&mut info.last_name, self.last_name);
        assign(&mut info.email, self.email);
        assign(&mut info.phone_number, self.phone_number);
        assign(&mut info.date_of_birth, self.date_of_birth);
        assign(&mut info.nationality, self.nationality);
        assign(&mut info.street_address, self.street_address);
        assign(&mut info.city, self.city);
        assign(&mut info.state, self.state);
        assign(&mut info.postal_code, self.postal_code);
        assign(&mut info.country, self.country);
        assign(&mut info.timezone, self.timezone);
        assign(&mut info.languages_spoken, self.languages_spoken);
        if let Some(contact) = self.emergency_contact {
            contact.apply(&mut info.emergency_contact);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmergencyContactPatch {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

impl EmergencyContactPatch {
    pub fn apply(self, contact: &mut EmergencyContact) {
        assign(&mut contact.name, self.name);
        assign(&mut contact.relationship, self.relationship);
        assign(&mut contact.phone_number, self.phone_number);
        assign(&mut contact.email, self.email);
    }
}

/// Scalar fields of the professional background that are not collections of entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfessionalProfilePatch {
    pub skills: Option<Vec<String>>,
    pub linkedin_profile: Option<String>,
    pub portfolio_url: Option<String>,
}

impl ProfessionalProfilePatch {
    pub fn apply(self, background: &mut ProfessionalBackground) {
        assign(&mut background.skills, self.skills);
        assign(&mut background.linkedin_profile, self.linkedin_profile);
        assign(&mut background.portfolio_url, self.portfolio_url);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationPatch {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    pub is_current: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub gpa: Option<Option<String>>,
    pub description: Option<String>,
}

impl EducationPatch {
    pub fn apply(self, entry: &mut Education) {
        assign(&mut entry.institution, self.institution);
        assign(&mut entry.degree, self.degree);
        assign(&mut entry.field_of_study, self.field_of_study);
        assign(&mut entry.start_date, self.start_date);
        assign(&mut entry.end_date, self.end_date);
        assign(&mut entry.is_current, self.is_current);
        assign(&mut entry.gpa, self.gpa);
        assign(&mut entry.description, self.description);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperiencePatch {
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    pub is_current: Option<bool>,
    pub description: Option<String>,
    pub responsibilities: Option<Vec<String>>,
}

impl ExperiencePatch {
    pub fn apply(self, entry: &mut Experience) {
        assign(&mut entry.company, self.company);
        assign(&mut entry.position, self.position);
        assign(&mut entry.location, self.location);
        assign(&mut entry.start_date, self.start_date);
        assign(&mut entry.end_date, self.end_date);
        assign(&mut entry.is_current, self.is_current);
        assign(&mut entry.description, self.description);
        assign(&mut entry.responsibilities, self.responsibilities);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferencePatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
    pub years_known: Option<u8>,
}

impl ReferencePatch {
    pub fn apply(self, entry: &mut Reference) {
        assign(&mut entry.name, self.name);
        assign(&mut entry.title, self.title);
        assign(&mut entry.company, self.company);
        assign(&mut entry.email, self.email);
        assign(&mut entry.phone, self.phone);
        assign(&mut entry.relationship, self.relationship);
        assign(&mut entry.years_known, self.years_known);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectPatch {
    pub subject: Option<String>,
    pub category: Option<String>,
    pub level: Option<SubjectLevel>,
    pub experience: Option<String>,
}

impl SubjectPatch {
    pub fn apply(self, entry: &mut SubjectToTeach) {
        assign(&mut entry.subject, self.subject);
        assign(&mut entry.category, self.category);
        assign(&mut entry.level, self.level);
        assign(&mut entry.experience, self.experience);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeachingExperiencePatch {
    pub institution: Option<String>,
    pub role: Option<String>,
    pub subject: Option<String>,
    pub level: Option<String>,
    pub start_date: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    pub is_current: Option<bool>,
    pub description: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub student_count: Option<Option<u32>>,
}

impl TeachingExperiencePatch {
    pub fn apply(self, entry: &mut TeachingExperience) {
        assign(&mut entry.institution, self.institution);
        assign(&mut entry.role, self.role);
        assign(&mut entry.subject, self.subject);
        assign(&mut entry.level, self.level);
        assign(&mut entry.start_date, self.start_date);
        assign(&mut entry.end_date, self.end_date);
        assign(&mut entry.is_current, self.is_current);
        assign(&mut entry.description, self.description);
        assign(&mut entry.student_count, self.student_count);
    }
}

/// Free-text and audience fields of the teaching step. Availability entries merge per day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeachingInformationPatch {
    pub teaching_motivation: Option<String>,
    pub teaching_philosophy: Option<String>,
    pub teaching_methodology: Option<String>,
    pub target_audience: Option<Vec<String>>,
    pub weekly_availability: Option<BTreeMap<Weekday, DayAvailability>>,
}

impl TeachingInformationPatch {
    pub fn apply(self, info: &mut TeachingInformation) {
        assign(&mut info.teaching_motivation, self.teaching_motivation);
        assign(&mut info.teaching_philosophy, self.teaching_philosophy);
        assign(&mut info.teaching_methodology, self.teaching_methodology);
        assign(&mut info.target_audience, self.target_audience);
        if let Some(days) = self.weekly_availability {
            info.weekly_availability.extend(days);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsentsPatch {
    pub term_of_service: Option<bool>,
    pub privacy_policy: Option<bool>,
    pub background_check: Option<bool>,
    pub data_processing: Option<bool>,
    pub marketing_communications: Option<bool>,
    pub code_of_conduct: Option<bool>,
}

impl ConsentsPatch {
    pub fn apply(self, consents: &mut Consents) {
        assign(&mut consents.term_of_service, self.term_of_service);
        assign(&mut consents.privacy_policy, self.privacy_policy);
        assign(&mut consents.background_check, self.background_check);
        assign(&mut consents.data_processing, self.data_processing);
        assign(
            &mut consents.marketing_communications,
            self.marketing_communications,
        );
        assign(&mut consents.code_of_conduct, self.code_of_conduct);
    }

    /// Accept or decline every consent at once.
    pub fn all(accepted: bool) -> Self {
        Self {
            term_of_service: Some(accepted),
            privacy_policy: Some(accepted),
            background_check: Some(accepted),
            data_processing: Some(accepted),
            marketing_communications: Some(accepted),
            code_of_conduct: Some(accepted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_null_clears_end_date_while_absent_keeps_it() {
        let mut entry = Education {
            end_date: Some("2020-06".to_string()),
            degree: "BSc".to_string(),
            ..Education::default()
        };

        let keep: EducationPatch =
            serde_json::from_value(serde_json::json!({ "degree": "MSc" })).expect("patch");
        keep.apply(&mut entry);
        assert_eq!(entry.end_date.as_deref(), Some("2020-06"));
        assert_eq!(entry.degree, "MSc");

        let clear: EducationPatch =
            serde_json::from_value(serde_json::json!({ "endDate": null, "isCurrent": true }))
                .expect("patch");
        clear.apply(&mut entry);
        assert_eq!(entry.end_date, None);
        assert!(entry.is_current);
    }

    #[test]
    fn emergency_contact_merges_inside_personal_info() {
        let mut info = PersonalInfo {
            first_name: "Ada".to_string(),
            emergency_contact: EmergencyContact {
                name: "Grace".to_string(),
                phone_number: "555-0100".to_string(),
                ..EmergencyContact::default()
            },
            ..PersonalInfo::default()
        };

        PersonalInfoPatch {
            emergency_contact: Some(EmergencyContactPatch {
                relationship: Some("sister".to_string()),
                ..EmergencyContactPatch::default()
            }),
            ..PersonalInfoPatch::default()
        }
        .apply(&mut info);

        assert_eq!(info.first_name, "Ada");
        assert_eq!(info.emergency_contact.name, "Grace");
        assert_eq!(info.emergency_contact.phone_number, "555-0100");
        assert_eq!(info.emergency_contact.relationship, "sister");
    }
}
