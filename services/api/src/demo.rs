use crate::infra::{
    InMemoryAuditLog, InMemoryBlobStore, LinkRenderer, LoggingNotifier, SeededDirectory,
    SignaturePhotoValidator,
};
use clap::Args;
use clearance::config::AppConfig;
use clearance::error::AppError;
use clearance::workflows::clearance::{
    ActiveOfficerSlot, Actor, AuditQuery, ClearanceWorkflowService, FileUpload, IntakeLimits,
    MemorySubmissionStore, StructuredForm, SubmissionDraft, SubmissionRecord, UploadIntake,
    UploadOutcome, WorkflowCollaborators,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

/// PNG signature followed by the start of an IHDR chunk.
const SAMPLE_PHOTO: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Passport photo to upload; content type is guessed from the extension.
    #[arg(long)]
    pub(crate) photo: Option<PathBuf>,
    /// Have the department head reject the first submission so it is resubmitted.
    #[arg(long)]
    pub(crate) reject_first: bool,
    /// Take the certificate renderer offline during final approval, then retry.
    #[arg(long)]
    pub(crate) fail_renderer: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        photo,
        reject_first,
        fail_renderer,
    } = args;
    let config = AppConfig::load()?;

    let notifier = Arc::new(LoggingNotifier::default());
    let renderer = Arc::new(LinkRenderer::default());
    let service = ClearanceWorkflowService::new(
        Arc::new(MemorySubmissionStore::new()),
        notifier.clone(),
        WorkflowCollaborators {
            renderer: renderer.clone(),
            directory: Arc::new(SeededDirectory::campus()),
            officers: Arc::new(ActiveOfficerSlot::new()),
        },
        &config.workflow,
    );
    let intake = UploadIntake::new(
        Arc::new(SignaturePhotoValidator),
        Arc::new(InMemoryBlobStore::default()),
        Arc::new(InMemoryAuditLog::default()),
        IntakeLimits::from(&config.workflow),
    );

    let student = Actor::student("stu-001");
    let head = Actor::department_head("hod-csc", "csc");
    let officer = Actor::admissions_officer("ao-001");
    let admin = Actor::administrator("admin-001");

    println!("Clearance workflow demo");
    let assignment = service.assign_officer(&admin, officer.id.clone())?;
    println!(
        "- Active admissions officer: {} (access code {})",
        assignment.officer_id, assignment.access_code
    );

    let upload = match photo {
        Some(path) => load_photo(path)?,
        None => FileUpload {
            file_name: "passport.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: SAMPLE_PHOTO.to_vec(),
        },
    };
    println!(
        "- Uploading {} ({}, {} bytes)",
        upload.file_name,
        upload.content_type,
        upload.size()
    );
    let accepted = match intake.accept_photo(&student.id, upload) {
        Ok(accepted) => accepted,
        Err(err) => {
            println!("  Photo refused: {err}");
            print_audit(&intake, &admin);
            return Ok(());
        }
    };
    println!("  Photo stored at {}", accepted.artifact().url);

    let draft = || SubmissionDraft::Structured {
        photo: accepted.clone(),
        form: demo_form(),
    };

    let record = service.submit(&student, draft())?;
    print_step("Submitted", &record);

    if reject_first {
        let record = service.department_reject(
            &head,
            &record.id,
            "Date of birth does not match the admission record",
        )?;
        print_step("Department rejected", &record);
        let record = service.resubmit(&student, &record.id, draft())?;
        print_step("Resubmitted", &record);
    }

    let record = service.department_approve(&head, &record.id, None)?;
    print_step("Department approved", &record);

    renderer.set_offline(fail_renderer);
    let record = service.final_approve(&officer, &record.id, Some("Cleared for NYSC".to_string()))?;
    print_step("Final approval", &record);

    if record.certificate.is_none() {
        println!("  Certificate not generated; submissions awaiting certificate:");
        for waiting in service.awaiting_certificate(&officer)? {
            println!("    - {} ({})", waiting.id, waiting.student_id);
        }
        renderer.set_offline(false);
        let certificate = service.regenerate_certificate(&officer, &record.id)?;
        println!("  Regenerated certificate: {}", certificate.document_url);
    }

    let record = service.submission(&student, &record.id)?;
    match serde_json::to_string_pretty(&record.status_view()) {
        Ok(json) => println!("\nPublic status payload:\n{json}"),
        Err(err) => println!("\nPublic status payload unavailable: {err}"),
    }

    println!("\nDecision history:");
    for entry in record.history.entries() {
        println!(
            "  - {} {} by {} ({}){}",
            entry.at.format("%Y-%m-%d %H:%M:%S"),
            entry.action.label(),
            entry.actor_id,
            entry.actor_role.label(),
            entry
                .remarks
                .as_deref()
                .map(|remarks| format!(": {remarks}"))
                .unwrap_or_default()
        );
    }

    println!("\nNotifications:");
    for notification in notifier.outbox() {
        println!(
            "  - {} -> {}",
            notification.template.label(),
            notification.recipient_email
        );
    }
    print_audit(&intake, &admin);

    let stats = service.stats(&admin)?;
    println!(
        "\nTotals: {} submission(s), {} resubmitted, {} awaiting certificate",
        stats.total, stats.resubmitted, stats.awaiting_certificate
    );

    Ok(())
}

fn load_photo(path: PathBuf) -> Result<FileUpload, AppError> {
    let bytes = std::fs::read(&path)?;
    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    Ok(FileUpload {
        file_name,
        content_type,
        bytes,
    })
}

fn demo_form() -> StructuredForm {
    StructuredForm {
        name: "Adaeze Okafor".to_string(),
        email: "stu-001@students.example.edu".to_string(),
        matric_number: "CSC/2019/1043".to_string(),
        phone: Some("+234 803 000 0000".to_string()),
        sex: Some("female".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2001, 4, 9),
        marital_status: Some("single".to_string()),
        state_of_origin: Some("Enugu".to_string()),
        lga: Some("Nsukka".to_string()),
        graduation_date: NaiveDate::from_ymd_opt(2024, 7, 30),
        course_of_study: Some("Computer Science".to_string()),
    }
}

fn print_step(label: &str, record: &SubmissionRecord) {
    println!(
        "- {label}: {} -> {}{}",
        record.id,
        record.status,
        record
            .remarks
            .as_deref()
            .map(|remarks| format!(" ({remarks})"))
            .unwrap_or_default()
    );
    if let Some(clearance_id) = &record.clearance_id {
        println!("  Clearance id: {clearance_id}");
    }
    if let Some(certificate) = &record.certificate {
        println!("  Certificate: {}", certificate.document_url);
    }
}

fn print_audit(intake: &UploadIntake, admin: &Actor) {
    println!("\nPhoto audit trail (newest first):");
    let records = match intake.upload_audits(admin, &AuditQuery::default()) {
        Ok(records) => records,
        Err(err) => {
            println!("  unavailable: {err}");
            return;
        }
    };
    for record in records {
        let outcome = match record.outcome {
            UploadOutcome::Accepted => "accepted".to_string(),
            UploadOutcome::Rejected => format!("rejected: {}", record.rejection_reasons.join("; ")),
        };
        println!(
            "  - {} ({} bytes) {}",
            record.file.file_name, record.file.size, outcome
        );
    }
}
