use super::common::*;
use crate::workflows::clearance::domain::{Actor, SubmissionId, SubmissionStatus, UserId};
use crate::workflows::clearance::history::HistoryAction;
use crate::workflows::clearance::notify::NotificationTemplate;
use crate::workflows::clearance::service::WorkflowError;

#[test]
fn upload_submission_reaches_certificate_through_both_reviews() {
    let harness = harness();

    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit succeeds");
    assert_eq!(submitted.status, SubmissionStatus::Pending);
    assert_eq!(submitted.department.0, "csc");
    assert_eq!(submitted.history.actions(), vec![HistoryAction::Submitted]);

    let reviewed = harness
        .service
        .department_approve(&hod(), &submitted.id, Some("documents in order".to_string()))
        .expect("department approval");
    assert_eq!(reviewed.status, SubmissionStatus::DepartmentApproved);
    assert_eq!(reviewed.remarks.as_deref(), Some("documents in order"));

    let cleared = harness
        .service
        .final_approve(&officer(), &submitted.id, None)
        .expect("final approval");
    assert_eq!(cleared.status, SubmissionStatus::FinallyApproved);
    assert_eq!(
        cleared.history.actions(),
        vec![
            HistoryAction::Submitted,
            HistoryAction::Approved,
            HistoryAction::Approved
        ]
    );

    let clearance_id = cleared.clearance_id.clone().expect("clearance id assigned");
    assert!(clearance_id.0.starts_with("NYSC-"));
    let certificate = cleared.certificate.clone().expect("certificate attached");
    assert_eq!(certificate.clearance_id, clearance_id);
    assert_eq!(
        certificate.document_url,
        format!("memory://certificates/{clearance_id}.pdf")
    );
    assert_eq!(harness.stored(&submitted.id), cleared);

    let templates: Vec<_> = harness
        .notifier
        .sent()
        .into_iter()
        .map(|notification| notification.template)
        .collect();
    assert_eq!(
        templates,
        vec![
            NotificationTemplate::SubmissionReceived,
            NotificationTemplate::DepartmentDecision,
            NotificationTemplate::FinalDecision
        ]
    );
    let final_notice = harness.notifier.sent().pop().expect("final notice");
    assert_eq!(final_notice.recipient_email, "s-1@example.edu");
    assert_eq!(
        final_notice.details.get("certificate_url"),
        Some(&certificate.document_url)
    );
}

#[test]
fn rejected_submission_can_be_resubmitted_and_cleared() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    let rejected = harness
        .service
        .department_reject(&hod(), &submitted.id, "photo is blurry")
        .expect("rejection");
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(rejected.remarks.as_deref(), Some("photo is blurry"));
    let rejection_entry = rejected.history.last().expect("entry");
    assert_eq!(rejection_entry.action, HistoryAction::Rejected);
    assert_eq!(rejection_entry.remarks.as_deref(), Some("photo is blurry"));

    let resubmitted = harness
        .service
        .resubmit(&student(), &submitted.id, structured_draft("s-1"))
        .expect("resubmission");
    assert_eq!(resubmitted.status, SubmissionStatus::Pending);
    assert_eq!(resubmitted.remarks, None);
    assert!(resubmitted.content.structured_form().is_some());

    harness
        .service
        .department_approve(&hod(), &submitted.id, None)
        .expect("department approval");
    let cleared = harness
        .service
        .final_approve(&officer(), &submitted.id, None)
        .expect("final approval");

    assert_eq!(
        cleared.history.actions(),
        vec![
            HistoryAction::Submitted,
            HistoryAction::Rejected,
            HistoryAction::Resubmitted,
            HistoryAction::Approved,
            HistoryAction::Approved
        ]
    );
    assert!(cleared.certificate.is_some());

    let stats = harness.service.stats(&admin()).expect("stats");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.resubmitted, 1);
    assert_eq!(stats.count(SubmissionStatus::FinallyApproved), 1);
}

#[test]
fn final_rejection_returns_submission_to_student() {
    let harness = harness();
    let reviewed = harness.department_approved();

    let rejected = harness
        .service
        .final_reject(&officer(), &reviewed.id, "  matric number mismatch ")
        .expect("final rejection");
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(rejected.remarks.as_deref(), Some("matric number mismatch"));
    assert_eq!(rejected.clearance_id, None);

    let resubmitted = harness
        .service
        .resubmit(&student(), &reviewed.id, upload_draft("s-1"))
        .expect("resubmission");
    assert_eq!(resubmitted.status, SubmissionStatus::Pending);
}

#[test]
fn rejection_without_remarks_changes_nothing() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    match harness
        .service
        .department_reject(&hod(), &submitted.id, "   ")
    {
        Err(WorkflowError::Validation(violation)) => assert_eq!(violation.field, "remarks"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(harness.stored(&submitted.id), submitted);
    assert_eq!(harness.notifier.sent().len(), 1);
}

#[test]
fn wrong_role_is_refused_before_any_change() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    for actor in [student(), officer(), admin()] {
        match harness
            .service
            .department_approve(&actor, &submitted.id, None)
        {
            Err(WorkflowError::Authorization(_)) => {}
            other => panic!("expected authorization error for {actor:?}, got {other:?}"),
        }
    }
    match harness.service.submit(&hod(), upload_draft("h-csc")) {
        Err(WorkflowError::Authorization(_)) => {}
        other => panic!("expected authorization error, got {other:?}"),
    }
    assert_eq!(harness.stored(&submitted.id), submitted);
}

#[test]
fn department_head_cannot_review_other_departments() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    match harness
        .service
        .department_approve(&other_hod(), &submitted.id, None)
    {
        Err(WorkflowError::Authorization(reason)) => assert!(reason.contains("csc")),
        other => panic!("expected authorization error, got {other:?}"),
    }

    let unscoped = Actor {
        department: None,
        ..hod()
    };
    assert!(matches!(
        harness
            .service
            .department_reject(&unscoped, &submitted.id, "no"),
        Err(WorkflowError::Authorization(_))
    ));
    assert_eq!(harness.stored(&submitted.id).status, SubmissionStatus::Pending);
}

#[test]
fn out_of_order_transitions_are_invalid() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    match harness.service.final_approve(&officer(), &submitted.id, None) {
        Err(WorkflowError::InvalidTransition { action, from }) => {
            assert_eq!(action, "final_approve");
            assert_eq!(from, SubmissionStatus::Pending);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert!(matches!(
        harness
            .service
            .resubmit(&student(), &submitted.id, upload_draft("s-1")),
        Err(WorkflowError::InvalidTransition {
            from: SubmissionStatus::Pending,
            ..
        })
    ));
    assert!(harness.renderer.requests().is_empty());
}

#[test]
fn finally_approved_is_terminal() {
    let harness = harness();
    let reviewed = harness.department_approved();
    harness
        .service
        .final_approve(&officer(), &reviewed.id, None)
        .expect("final approval");

    assert!(matches!(
        harness
            .service
            .final_reject(&officer(), &reviewed.id, "changed my mind"),
        Err(WorkflowError::InvalidTransition {
            from: SubmissionStatus::FinallyApproved,
            ..
        })
    ));
    assert!(matches!(
        harness
            .service
            .resubmit(&student(), &reviewed.id, upload_draft("s-1")),
        Err(WorkflowError::InvalidTransition {
            from: SubmissionStatus::FinallyApproved,
            ..
        })
    ));
    assert!(matches!(
        harness.service.submit(&student(), upload_draft("s-1")),
        Err(WorkflowError::Conflict(_))
    ));
}

#[test]
fn one_submission_per_student() {
    let harness = harness();
    let first = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    match harness.service.submit(&student(), upload_draft("s-1")) {
        Err(WorkflowError::Conflict(message)) => assert!(message.contains(&first.id.0)),
        other => panic!("expected conflict, got {other:?}"),
    }

    harness
        .service
        .department_reject(&hod(), &first.id, "wrong form")
        .expect("rejection");
    match harness.service.submit(&student(), upload_draft("s-1")) {
        Err(WorkflowError::InvalidTransition { action, from }) => {
            assert_eq!(action, "submit");
            assert_eq!(from, SubmissionStatus::Rejected);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn only_the_active_officer_decides() {
    let harness = harness();
    let reviewed = harness.department_approved();
    let deputy = Actor::admissions_officer("ao-2");

    assert!(matches!(
        harness.service.final_approve(&deputy, &reviewed.id, None),
        Err(WorkflowError::Authorization(_))
    ));
    assert_eq!(
        harness.stored(&reviewed.id).status,
        SubmissionStatus::DepartmentApproved
    );

    assert!(matches!(
        harness
            .service
            .assign_officer(&officer(), UserId("ao-2".to_string())),
        Err(WorkflowError::Authorization(_))
    ));
    let assignment = harness
        .service
        .assign_officer(&admin(), UserId("ao-2".to_string()))
        .expect("admin assigns officer");
    assert_eq!(assignment.officer_id.0, "ao-2");
    assert!(assignment.access_code.starts_with("AO-"));

    assert!(matches!(
        harness
            .service
            .final_reject(&officer(), &reviewed.id, "stale officer"),
        Err(WorkflowError::Authorization(_))
    ));
    let rejected = harness
        .service
        .final_reject(&deputy, &reviewed.id, "signature missing")
        .expect("new officer decides");
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
}

#[test]
fn student_may_only_resubmit_own_submission() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");
    harness
        .service
        .department_reject(&hod(), &submitted.id, "incomplete")
        .expect("rejection");

    assert!(matches!(
        harness
            .service
            .resubmit(&classmate(), &submitted.id, upload_draft("s-2")),
        Err(WorkflowError::Authorization(_))
    ));
    assert_eq!(harness.stored(&submitted.id).status, SubmissionStatus::Rejected);
}

#[test]
fn photo_must_belong_to_submitting_student() {
    let harness = harness();
    match harness.service.submit(&student(), upload_draft("s-2")) {
        Err(WorkflowError::Validation(violation)) => assert_eq!(violation.field, "photo"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(harness.service.my_submission(&student()).expect("query").is_none());
}

#[test]
fn invalid_structured_form_is_rejected_at_submit() {
    let harness = harness();
    let mut form = structured_form();
    form.email = "not-an-email".to_string();
    let draft = crate::workflows::clearance::service::SubmissionDraft::Structured {
        photo: accepted_photo("s-1"),
        form,
    };

    match harness.service.submit(&student(), draft) {
        Err(WorkflowError::Validation(violation)) => assert_eq!(violation.field, "email"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn unknown_student_cannot_submit() {
    let harness = harness();
    assert!(matches!(
        harness
            .service
            .submit(&Actor::student("s-9"), upload_draft("s-9")),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn structured_submission_prints_form_details_and_graduation_year() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), structured_draft("s-1"))
        .expect("submit");
    harness
        .service
        .department_approve(&hod(), &submitted.id, None)
        .expect("department approval");
    let cleared = harness
        .service
        .final_approve(&officer(), &submitted.id, None)
        .expect("final approval");

    let clearance_id = cleared.clearance_id.expect("clearance id");
    assert!(clearance_id.0.starts_with("NYSC-2024-"));

    let requests = harness.renderer.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.clearance_id, clearance_id);
    assert_eq!(request.student.matric_number, "CSC/2019/001");
    assert_eq!(request.student.graduation_date.as_deref(), Some("2024-07-30"));
    assert_eq!(request.department.name, "Computer Science");
    assert_eq!(request.photo_url, "memory://s-1/photo.jpg");
    assert_eq!(request.department_approval.name, "Dr. Kemi Ojo");
    assert_eq!(request.final_approval.name, "Mr. Tunde Bello");
}

#[test]
fn renderer_failure_leaves_approval_awaiting_certificate() {
    let harness = harness();
    let reviewed = harness.department_approved();
    harness.renderer.fail(true);

    let cleared = harness
        .service
        .final_approve(&officer(), &reviewed.id, None)
        .expect("approval commits without certificate");
    assert_eq!(cleared.status, SubmissionStatus::FinallyApproved);
    assert!(cleared.certificate.is_none());
    let clearance_id = cleared.clearance_id.clone().expect("clearance id kept");

    let final_notice = harness.notifier.sent().pop().expect("final notice");
    assert!(!final_notice.details.contains_key("certificate_url"));

    let waiting = harness
        .service
        .awaiting_certificate(&officer())
        .expect("query");
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].id, reviewed.id);

    harness.renderer.fail(false);
    let certificate = harness
        .service
        .regenerate_certificate(&officer(), &reviewed.id)
        .expect("regeneration");
    assert_eq!(certificate.clearance_id, clearance_id);
    assert_eq!(
        harness.stored(&reviewed.id).certificate,
        Some(certificate.clone())
    );
    assert!(harness
        .service
        .awaiting_certificate(&admin())
        .expect("query")
        .is_empty());

    let again = harness
        .service
        .regenerate_certificate(&officer(), &reviewed.id)
        .expect("existing certificate returned");
    assert_eq!(again, certificate);
    assert_eq!(harness.renderer.requests().len(), 1);
}

#[test]
fn regeneration_requires_final_approval_and_active_officer() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    assert!(matches!(
        harness
            .service
            .regenerate_certificate(&officer(), &submitted.id),
        Err(WorkflowError::InvalidTransition {
            action: "regenerate_certificate",
            from: SubmissionStatus::Pending
        })
    ));
    assert!(matches!(
        harness
            .service
            .regenerate_certificate(&admin(), &submitted.id),
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        harness
            .service
            .regenerate_certificate(&officer(), &SubmissionId("sub-missing".to_string())),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn notification_failure_does_not_block_transitions() {
    let harness = harness();
    harness.notifier.fail(true);

    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit despite notifier outage");
    let reviewed = harness
        .service
        .department_approve(&hod(), &submitted.id, None)
        .expect("approval despite notifier outage");
    assert_eq!(reviewed.status, SubmissionStatus::DepartmentApproved);
    assert!(harness.notifier.sent().is_empty());
}

#[test]
fn racing_department_decisions_have_one_winner() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    let service = &harness.service;
    let id = &submitted.id;
    let (approved, rejected) = std::thread::scope(|scope| {
        let approve = scope.spawn(|| service.department_approve(&hod(), id, None));
        let reject = scope.spawn(|| service.department_reject(&hod(), id, "duplicate matric"));
        (
            approve.join().expect("approve thread"),
            reject.join().expect("reject thread"),
        )
    });

    let winners = [approved.is_ok(), rejected.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    for loser in [approved, rejected].into_iter().filter_map(Result::err) {
        assert!(
            matches!(
                loser,
                WorkflowError::Conflict(_)
                    | WorkflowError::InvalidTransition {
                        from: SubmissionStatus::DepartmentApproved | SubmissionStatus::Rejected,
                        ..
                    }
            ),
            "unexpected loser error {loser:?}"
        );
    }
    assert_eq!(harness.stored(id).history.len(), 2);
}

#[test]
fn queues_are_scoped_by_role_and_department() {
    let harness = harness();
    let ada = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit s-1");
    let chidi = harness
        .service
        .submit(&Actor::student("s-3"), upload_draft("s-3"))
        .expect("submit s-3");
    harness
        .service
        .department_approve(&hod(), &ada.id, None)
        .expect("approve s-1");

    let csc = harness.service.department_queue(&hod()).expect("csc queue");
    assert_eq!(csc.len(), 1);
    assert_eq!(csc[0].id, ada.id);
    let mth = harness
        .service
        .department_queue(&other_hod())
        .expect("mth queue");
    assert_eq!(mth.len(), 1);
    assert_eq!(mth[0].id, chidi.id);

    let final_queue = harness.service.final_queue(&officer()).expect("final queue");
    assert_eq!(final_queue.len(), 1);
    assert_eq!(final_queue[0].id, ada.id);

    let pending = harness
        .service
        .list(&admin(), Some(SubmissionStatus::Pending))
        .expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(harness.service.list(&officer(), None).expect("list").len(), 2);

    assert!(matches!(
        harness.service.list(&student(), None),
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        harness.service.department_queue(&officer()),
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        harness.service.stats(&officer()),
        Err(WorkflowError::Authorization(_))
    ));
}

#[test]
fn submission_visibility_follows_ownership_and_department() {
    let harness = harness();
    let submitted = harness
        .service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");

    for actor in [student(), hod(), officer(), admin()] {
        assert!(
            harness.service.submission(&actor, &submitted.id).is_ok(),
            "{actor:?} should see the submission"
        );
    }
    for actor in [classmate(), other_hod()] {
        assert!(matches!(
            harness.service.submission(&actor, &submitted.id),
            Err(WorkflowError::Authorization(_))
        ));
    }

    let mine = harness
        .service
        .my_submission(&student())
        .expect("query")
        .expect("present");
    assert_eq!(mine.id, submitted.id);
}

#[test]
fn certificate_lookup_respects_ownership() {
    let harness = harness();
    let reviewed = harness.department_approved();
    let owner = UserId("s-1".to_string());

    assert!(matches!(
        harness.service.certificate(&student(), &owner),
        Err(WorkflowError::NotFound(_))
    ));

    harness
        .service
        .final_approve(&officer(), &reviewed.id, None)
        .expect("final approval");
    let certificate = harness
        .service
        .certificate(&student(), &owner)
        .expect("owner sees certificate");
    assert_eq!(
        harness
            .service
            .certificate(&admin(), &owner)
            .expect("admin sees certificate"),
        certificate
    );
    assert!(matches!(
        harness.service.certificate(&classmate(), &owner),
        Err(WorkflowError::Authorization(_))
    ));
}

#[test]
fn store_outage_surfaces_as_unavailable() {
    let service = unavailable_service();
    let error = service
        .submit(&student(), upload_draft("s-1"))
        .expect_err("store offline");
    assert!(matches!(error, WorkflowError::Repository(_)));
    assert_eq!(error.kind(), "unavailable");
}

#[test]
fn pre_checks_refuse_what_the_transitions_would_refuse() {
    let harness = harness();
    let service = &harness.service;

    service
        .ensure_can_submit(&student())
        .expect("first submission allowed");
    assert!(matches!(
        service.ensure_can_submit(&hod()),
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        service.ensure_can_submit(&Actor::student("s-9")),
        Err(WorkflowError::NotFound(_))
    ));

    let submitted = service
        .submit(&student(), upload_draft("s-1"))
        .expect("submit");
    assert!(matches!(
        service.ensure_can_submit(&student()),
        Err(WorkflowError::Conflict(_))
    ));
    assert!(matches!(
        service.ensure_can_resubmit(&student(), &submitted.id),
        Err(WorkflowError::InvalidTransition {
            from: SubmissionStatus::Pending,
            ..
        })
    ));

    service
        .department_reject(&hod(), &submitted.id, "photo is blurred")
        .expect("rejection");
    service
        .ensure_can_resubmit(&student(), &submitted.id)
        .expect("owner may resubmit");
    assert!(matches!(
        service.ensure_can_resubmit(&classmate(), &submitted.id),
        Err(WorkflowError::Authorization(_))
    ));
    assert!(matches!(
        service.ensure_can_submit(&student()),
        Err(WorkflowError::InvalidTransition { .. })
    ));
    assert!(matches!(
        service.ensure_can_resubmit(&student(), &SubmissionId("sub-missing".to_string())),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn overlapping_certificate_retry_does_not_render_twice() {
    let harness = harness();
    let reviewed = harness.department_approved();
    let (entered, release) = harness.renderer.hold_next();

    let cleared = std::thread::scope(|scope| {
        let approval =
            scope.spawn(|| harness.service.final_approve(&officer(), &reviewed.id, None));
        entered
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("final approval reached the renderer");

        match harness
            .service
            .regenerate_certificate(&officer(), &reviewed.id)
        {
            Err(WorkflowError::Conflict(reason)) => {
                assert!(reason.contains("already being generated"))
            }
            other => panic!("expected conflict while rendering, got {other:?}"),
        }

        release.send(()).expect("renderer released");
        approval
            .join()
            .expect("approval thread")
            .expect("final approval")
    });

    let certificate = cleared.certificate.clone().expect("certificate attached");
    let again = harness
        .service
        .regenerate_certificate(&officer(), &reviewed.id)
        .expect("existing certificate returned");
    assert_eq!(again, certificate);
    assert_eq!(harness.renderer.requests().len(), 1);
    assert_eq!(harness.stored(&reviewed.id).certificate, Some(certificate));
}
