use crate::infra::{local_storage, InMemoryUploadService, InMemoryVerificationService};
use clap::Args;
use instructor_intake::config::EngineConfig;
use instructor_intake::error::AppError;
use instructor_intake::workflows::verification::patch::{
    ConsentsPatch, EducationPatch, ExperiencePatch, PersonalInfoPatch, ReferencePatch,
    SubjectPatch, TeachingInformationPatch,
};
use instructor_intake::workflows::verification::{
    Collaborators, DocumentSlot, FileUpload, LoadOutcome, Session, StoreError, SubjectLevel,
    TracingNotifier, VerificationStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEMO_USER: &str = "demo-instructor";
const DEMO_TOKEN: &str = "demo-token";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Identity document to upload (defaults to a generated PDF)
    #[arg(long)]
    pub(crate) identity: Option<PathBuf>,
    /// Profile photo to upload (defaults to a generated PNG)
    #[arg(long)]
    pub(crate) photo: Option<PathBuf>,
    /// Resume to upload (defaults to a generated PDF)
    #[arg(long)]
    pub(crate) resume: Option<PathBuf>,
    /// Keep local snapshots in this directory instead of memory
    #[arg(long)]
    pub(crate) storage_dir: Option<PathBuf>,
    /// Stop at the review step without submitting
    #[arg(long)]
    pub(crate) skip_submit: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        identity,
        photo,
        resume,
        storage_dir,
        skip_submit,
    } = args;

    let config = EngineConfig {
        storage_dir,
        ..EngineConfig::default()
    };
    let uploads = Arc::new(InMemoryUploadService::default());
    let store = VerificationStore::new(
        Collaborators {
            remote: Arc::new(InMemoryVerificationService::default()),
            uploads: uploads.clone(),
            notifier: Arc::new(TracingNotifier),
            storage: local_storage(&config),
        },
        config,
    );
    let session = Session::new(DEMO_USER, DEMO_TOKEN);

    println!("Instructor application demo");
    match store.load_application(&session).await? {
        LoadOutcome::Hydrated { verification_id } => {
            println!("- verification record {verification_id} ready for editing")
        }
        LoadOutcome::Locked {
            verification_id,
            status,
        } => {
            println!(
                "- verification record {verification_id} is {}; nothing to edit",
                status.label()
            );
            return Ok(());
        }
    }

    store.update_personal_info(PersonalInfoPatch {
        first_name: Some("Katherine".to_string()),
        last_name: Some("Johnson".to_string()),
        email: Some("katherine@example.test".to_string()),
        phone_number: Some("+1 555 0199".to_string()),
        date_of_birth: Some("1918-08-26".to_string()),
        nationality: Some("American".to_string()),
        street_address: Some("1 Langley Way".to_string()),
        city: Some("Hampton".to_string()),
        country: Some("United States".to_string()),
        ..PersonalInfoPatch::default()
    })?;
    advance(&store)?;

    store.add_education(EducationPatch {
        institution: Some("West Virginia State College".to_string()),
        degree: Some("BS".to_string()),
        field_of_study: Some("Mathematics".to_string()),
        start_date: Some("1933-09".to_string()),
        end_date: Some(Some("1937-06".to_string())),
        ..EducationPatch::default()
    })?;
    store.add_experience(ExperiencePatch {
        company: Some("NACA".to_string()),
        position: Some("Research Mathematician".to_string()),
        start_date: Some("1953-06".to_string()),
        end_date: Some(Some("1986-08".to_string())),
        ..ExperiencePatch::default()
    })?;
    for (name, relationship) in [("Dorothy", "Supervisor"), ("Mary", "Colleague")] {
        store.add_reference(ReferencePatch {
            name: Some(name.to_string()),
            email: Some(format!("{}@example.test", name.to_lowercase())),
            relationship: Some(relationship.to_string()),
            years_known: Some(12),
            ..ReferencePatch::default()
        })?;
    }
    advance(&store)?;

    store.add_subject(SubjectPatch {
        subject: Some("Orbital Mechanics".to_string()),
        category: Some("Mathematics".to_string()),
        level: Some(SubjectLevel::Expert),
        ..SubjectPatch::default()
    })?;
    store.update_teaching_information(TeachingInformationPatch {
        teaching_motivation: Some(
            "I want students to trust their own calculations, check them twice, and \
             see how careful arithmetic carries people safely to orbit and back."
                .to_string(),
        ),
        teaching_philosophy: Some("Ask questions, then verify every answer".to_string()),
        target_audience: Some(vec!["High school students".to_string()]),
        ..TeachingInformationPatch::default()
    })?;
    advance(&store)?;

    for (slot, path, fallback) in [
        (DocumentSlot::IdentityDocument, identity, "passport.pdf"),
        (DocumentSlot::ProfilePhoto, photo, "portrait.png"),
        (DocumentSlot::Resume, resume, "resume.pdf"),
    ] {
        let file = demo_file(path.as_deref(), fallback)?;
        println!(
            "- uploading {} ({}, {} bytes) as {}",
            file.name,
            file.mime_type,
            file.size(),
            slot.field_name()
        );
        store.upload_document(slot, file, &session).await?;
    }
    advance(&store)?;
    println!("- {} files stored by the upload service", uploads.uploaded());

    if skip_submit {
        store.save_application(&session).await?;
        print_steps(&store);
        println!("Draft saved; submission skipped.");
        return Ok(());
    }

    match store.submit_application(&session).await {
        Err(StoreError::Validation { errors }) => {
            println!("Submission blocked until consents are given:");
            for error in errors {
                println!("  - {error}");
            }
        }
        Err(other) => return Err(other.into()),
        Ok(outcome) => {
            println!("Application {} submitted", outcome.verification_id);
            return Ok(());
        }
    }

    store.update_consents(ConsentsPatch {
        term_of_service: Some(true),
        privacy_policy: Some(true),
        background_check: Some(true),
        ..ConsentsPatch::default()
    })?;
    let outcome = store.submit_application(&session).await?;

    print_steps(&store);
    println!(
        "Application {} {} at {}",
        outcome.verification_id,
        outcome.status.label(),
        outcome.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

fn advance(store: &VerificationStore) -> Result<(), AppError> {
    let from = store.current_step();
    let to = store.next_step()?;
    println!(
        "- {} complete -> {} ({:.0}% overall)",
        from.title(),
        to.title(),
        store.overall_progress()
    );
    Ok(())
}

fn print_steps(store: &VerificationStore) {
    store.flush_validation();
    let state = store.snapshot();
    println!("\nStep summary");
    for step in &state.steps {
        let marker = if step.is_valid { "ok" } else { "--" };
        println!(
            "  [{marker}] {:<24} {:>3}%",
            step.title, step.completion_percentage
        );
        for warning in &step.warnings {
            println!("        warning: {warning}");
        }
    }
}

/// Read a user-supplied file, or synthesize a small one named `fallback`.
fn demo_file(path: Option<&Path>, fallback: &str) -> Result<FileUpload, AppError> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| fallback.to_string());
            let mime_type = mime_guess::from_path(path).first_or_octet_stream();
            Ok(FileUpload::new(name, mime_type.essence_str(), bytes))
        }
        None => {
            let mime_type = mime_guess::from_path(fallback).first_or_octet_stream();
            let bytes = format!("demo content for {fallback}").into_bytes();
            Ok(FileUpload::new(fallback, mime_type.essence_str(), bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_files_get_guessed_mime_types() {
        let photo = demo_file(None, "portrait.png").expect("synthesized");
        assert_eq!(photo.mime_type, "image/png");
        assert!(photo.size() > 0);

        let resume = demo_file(None, "resume.pdf").expect("synthesized");
        assert_eq!(resume.mime_type, "application/pdf");
    }

    #[test]
    fn missing_files_surface_io_errors() {
        let err = demo_file(Some(Path::new("/definitely/not/here.pdf")), "resume.pdf")
            .expect_err("missing");
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn demo_runs_to_submission() {
        run_demo(DemoArgs::default()).await.expect("demo completes");
    }
}
