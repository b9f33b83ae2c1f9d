use super::super::domain::{
    ApplicationDocument, Consents, Documents, PersonalInfo, ProfessionalBackground,
    TeachingInformation,
};
use super::StepValidation;

pub(crate) const MIN_MOTIVATION_CHARS: usize = 100;
pub(crate) const RECOMMENDED_MOTIVATION_CHARS: usize = 250;
pub(crate) const MIN_REFERENCES: usize = 2;
pub(crate) const RECOMMENDED_REFERENCES: usize = 3;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn percentage(fraction: f32) -> u8 {
    let scaled = (fraction * 100.0).round();
    scaled.clamp(0.0, 100.0) as u8
}

/// Share of `have` against `need`, saturating at one.
fn coverage(have: usize, need: usize) -> f32 {
    if need == 0 {
        return 1.0;
    }
    have.min(need) as f32 / need as f32
}

pub(crate) fn personal_information(info: &PersonalInfo) -> StepValidation {
    let required: [(&str, &str); 9] = [
        ("First name", info.first_name.as_str()),
        ("Last name", info.last_name.as_str()),
        ("Email", info.email.as_str()),
        ("Phone number", info.phone_number.as_str()),
        ("Date of birth", info.date_of_birth.as_str()),
        ("Nationality", info.nationality.as_str()),
        ("Street address", info.street_address.as_str()),
        ("City", info.city.as_str()),
        ("Country", info.country.as_str()),
    ];

    let errors: Vec<String> = required
        .iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(label, _)| format!("{label} is required"))
        .collect();
    let filled = required.len() - errors.len();

    let mut warnings = Vec::new();
    if info.emergency_contact.is_empty() {
        warnings.push("No emergency contact provided".to_string());
    }
    if info.languages_spoken.is_empty() {
        warnings.push("List at least one language you speak".to_string());
    }

    StepValidation::from_parts(errors, warnings, percentage(coverage(filled, required.len())))
}

pub(crate) fn professional_background(background: &ProfessionalBackground) -> StepValidation {
    let mut errors = Vec::new();
    if background.education.is_empty() {
        errors.push("At least one education entry is required".to_string());
    }
    if background.experience.is_empty() {
        errors.push("At least one work experience entry is required".to_string());
    }
    if background.references.len() < MIN_REFERENCES {
        errors.push(format!("At least {MIN_REFERENCES} references are required"));
    }

    let mut warnings = Vec::new();
    if background.references.len() >= MIN_REFERENCES
        && background.references.len() < RECOMMENDED_REFERENCES
    {
        warnings.push(format!(
            "Applications with {RECOMMENDED_REFERENCES} or more references are reviewed faster"
        ));
    }

    let fraction = (coverage(background.education.len(), 1)
        + coverage(background.experience.len(), 1)
        + coverage(background.references.len(), MIN_REFERENCES))
        / 3.0;

    StepValidation::from_parts(errors, warnings, percentage(fraction))
}

pub(crate) fn teaching_information(info: &TeachingInformation) -> StepValidation {
    let mut errors = Vec::new();
    if info.subjects_to_teach.is_empty() {
        errors.push("At least one subject to teach is required".to_string());
    }

    let motivation_chars = info.teaching_motivation.chars().count();
    if is_blank(&info.teaching_motivation) {
        errors.push("Teaching motivation is required".to_string());
    } else if motivation_chars < MIN_MOTIVATION_CHARS {
        errors.push(format!(
            "Teaching motivation must be at least {MIN_MOTIVATION_CHARS} characters"
        ));
    }

    if is_blank(&info.teaching_philosophy) {
        errors.push("Teaching philosophy is required".to_string());
    }
    if info.target_audience.is_empty() {
        errors.push("At least one target audience is required".to_string());
    }

    let mut warnings = Vec::new();
    if (MIN_MOTIVATION_CHARS..RECOMMENDED_MOTIVATION_CHARS).contains(&motivation_chars) {
        warnings.push(format!(
            "A teaching motivation of {RECOMMENDED_MOTIVATION_CHARS}+ characters is recommended"
        ));
    }
    if !info
        .weekly_availability
        .values()
        .any(|day| day.available && !day.time_slots.is_empty())
    {
        warnings.push("No weekly availability has been provided".to_string());
    }

    let fraction = (coverage(info.subjects_to_teach.len(), 1)
        + coverage(motivation_chars, MIN_MOTIVATION_CHARS)
        + coverage(usize::from(!is_blank(&info.teaching_philosophy)), 1)
        + coverage(info.target_audience.len(), 1))
        / 4.0;

    StepValidation::from_parts(errors, warnings, percentage(fraction))
}

pub(crate) fn documents(documents: &Documents) -> StepValidation {
    let required = [
        ("Identity document", documents.identity_document.is_some()),
        ("Profile photo", documents.profile_photo.is_some()),
        ("Resume", documents.resume.is_some()),
    ];

    let errors: Vec<String> = required
        .iter()
        .filter(|(_, present)| !present)
        .map(|(label, _)| format!("{label} is required"))
        .collect();
    let present = required.len() - errors.len();

    let mut warnings = Vec::new();
    if documents.education_certificates.is_empty()
        && documents.professional_certifications.is_empty()
    {
        warnings.push("No certificates uploaded".to_string());
    }

    StepValidation::from_parts(errors, warnings, percentage(coverage(present, required.len())))
}

pub(crate) fn review(consents: &Consents) -> StepValidation {
    let errors: Vec<String> = consents
        .mandatory()
        .iter()
        .filter(|(_, accepted)| !accepted)
        .map(|(consent, _)| consent.requirement().to_string())
        .collect();

    let accepted = consents.accepted_mandatory();
    StepValidation::from_parts(
        errors,
        Vec::new(),
        percentage(coverage(accepted, consents.mandatory().len())),
    )
}

pub(crate) fn all_sections(document: &ApplicationDocument) -> [StepValidation; 4] {
    [
        personal_information(&document.personal_info),
        professional_background(&document.professional_background),
        teaching_information(&document.teaching_information),
        documents(&document.documents),
    ]
}
