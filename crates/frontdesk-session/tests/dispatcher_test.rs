//! Tool dispatcher tests against a real file-backed ledger: every tool's
//! happy path plus the spoken-clarification paths for conflicts, unknown
//! ids, bad arguments, and out-of-policy times.

use chrono::{DateTime, TimeZone, Utc};
use frontdesk_db::{create_pool, run_migrations, DbSettings};
use frontdesk_ledger::Ledger;
use frontdesk_session::{SessionContext, ToolDispatcher};
use frontdesk_types::{AppointmentStatus, BusinessHours, User};
use frontdesk_voice::ToolCallRequest;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

fn ledger_with_tempdir() -> (TempDir, Ledger) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("dispatcher_test.db");
    let pool = create_pool(path.to_str().expect("utf-8 path"), DbSettings::default())
        .expect("should create pool");
    let conn = pool.get().expect("should get connection");
    run_migrations(&conn).expect("migrations should succeed");
    (dir, Ledger::new(pool))
}

fn rig() -> (TempDir, Ledger, ToolDispatcher, SessionContext) {
    let (dir, ledger) = ledger_with_tempdir();
    let dispatcher = ToolDispatcher::new(ledger.clone(), BusinessHours::default());
    let context = SessionContext::new(Uuid::new_v4());
    (dir, ledger, dispatcher, context)
}

async fn seeded_user(ledger: &Ledger, phone: &str) -> User {
    ledger
        .create_user(phone, Some("Test Caller".to_string()))
        .await
        .expect("user creation should succeed")
}

fn request(name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: format!("call-{name}"),
        name: name.to_string(),
        arguments,
    }
}

/// 2030-01-07 is a Monday, comfortably in the future for every test run.
fn monday(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[tokio::test]
async fn identify_unknown_number_suggests_creating_an_account() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request("identify_user", json!({ "phone": "+15550107777" })),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("No account found for +15550107777"));
    assert!(!outcome.end_call);
    assert!(context.user.is_none());
}

#[tokio::test]
async fn identify_lists_upcoming_appointments_with_ids() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100001").await;
    let appointment = ledger
        .book_appointment(user.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");

    let outcome = dispatcher
        .dispatch(
            &request("identify_user", json!({ "phone": "+15550100001" })),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("Found user Test Caller"));
    assert!(outcome.sentence.contains(&format!("user id {}", user.id)));
    assert!(outcome.sentence.contains("Monday, January 7 at 10:00 AM"));
    assert!(outcome.sentence.contains(&format!("(id {})", appointment.id)));
    assert_eq!(context.user.as_ref().map(|u| u.id), Some(user.id));
}

#[tokio::test]
async fn identify_lists_at_most_five_appointments() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100002").await;
    for day in 7..13 {
        let start = Utc
            .with_ymd_and_hms(2030, 1, day, 10, 0, 0)
            .single()
            .expect("valid timestamp");
        ledger
            .book_appointment(user.id, start, 60, None)
            .await
            .expect("booking should succeed");
    }

    let outcome = dispatcher
        .dispatch(
            &request("identify_user", json!({ "phone": "+15550100002" })),
            &mut context,
        )
        .await;

    assert_eq!(outcome.sentence.matches("(id ").count(), 5);
    assert!(!outcome.sentence.contains("January 12"));
}

#[tokio::test]
async fn identify_rejects_a_malformed_number() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request("identify_user", json!({ "phone": "not a number" })),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("doesn't look right"));
    assert!(context.user.is_none());
}

#[tokio::test]
async fn create_user_welcomes_back_an_existing_number() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let existing = seeded_user(&ledger, "+15550100003").await;

    let outcome = dispatcher
        .dispatch(
            &request(
                "create_user",
                json!({ "phone": "+15550100003", "name": "Someone Else" }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("already exists for Test Caller"));
    assert!(outcome.sentence.contains(&format!("user id {}", existing.id)));
    assert_eq!(context.user.as_ref().map(|u| u.id), Some(existing.id));
}

#[tokio::test]
async fn create_user_reports_the_new_account() {
    let (_dir, ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request(
                "create_user",
                json!({ "phone": "+1 (555) 010-0004", "name": "Dana" }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("Created an account for Dana"));
    let stored = ledger
        .user_by_phone("+15550100004")
        .await
        .expect("lookup should succeed")
        .expect("user should exist under the normalized number");
    assert_eq!(context.user.as_ref().map(|u| u.id), Some(stored.id));
}

#[tokio::test]
async fn availability_defaults_to_today() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(&request("get_availability", json!({})), &mut context)
        .await;

    // Whether slots remain depends on the hour; the label does not.
    assert!(outcome.sentence.contains("today"));
}

#[tokio::test]
async fn availability_lists_open_slots_and_skips_booked_ones() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100005").await;
    ledger
        .book_appointment(user.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");

    let outcome = dispatcher
        .dispatch(
            &request("get_availability", json!({ "from_date": "2030-01-07" })),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("7 slots open on Monday, January 7"));
    assert!(outcome.sentence.contains("9:00 AM"));
    assert!(outcome.sentence.contains("4:00 PM"));
    assert!(!outcome.sentence.contains("10:00 AM"));
}

#[tokio::test]
async fn availability_spans_multiple_days_grouped_by_date() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request(
                "get_availability",
                json!({ "from_date": "2030-01-07", "to_date": "2030-01-08" }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.starts_with("Open slots:"));
    assert!(outcome.sentence.contains("Monday, January 7"));
    assert!(outcome.sentence.contains("Tuesday, January 8"));
}

#[tokio::test]
async fn availability_asks_again_about_a_nonsense_date() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request("get_availability", json!({ "from_date": "whenever suits" })),
            &mut context,
        )
        .await;

    assert!(outcome
        .sentence
        .contains("couldn't understand the date 'whenever suits'"));
}

#[tokio::test]
async fn book_confirms_and_notes_the_appointment() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100006").await;

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({
                    "user_id": user.id,
                    "start": { "date": "2030-01-07", "time": "10 am" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome
        .sentence
        .contains("Appointment confirmed for Monday, January 7 at 10:00 AM"));

    let booked = ledger
        .appointments_for_user(user.id, Some(AppointmentStatus::Booked))
        .await
        .expect("listing should succeed");
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].starts_at, monday(10));
    assert_eq!(booked[0].duration_minutes, 60);
    assert_eq!(context.booked(), &[booked[0].id]);
}

#[tokio::test]
async fn book_conflict_offers_alternative_times() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let alice = seeded_user(&ledger, "+15550100007").await;
    let bob = ledger
        .create_user("+15550100008", Some("Bob".to_string()))
        .await
        .expect("user creation should succeed");
    ledger
        .book_appointment(alice.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({
                    "user_id": bob.id,
                    "start": { "date": "2030-01-07", "time": "10:00" }
                }),
            ),
            &mut context,
        )
        .await;

    assert_eq!(
        outcome.sentence,
        "10:00 AM is already booked. How about 9:00 AM, 11:00 AM and 12:00 PM?"
    );
    assert!(context.booked().is_empty());
}

#[tokio::test]
async fn book_outside_hours_names_the_policy() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100009").await;

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({
                    "user_id": user.id,
                    "start": { "date": "2030-01-07", "time": "8 pm" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("outside business hours"));
    assert!(outcome.sentence.contains("between 9:00 and 17:00"));
}

#[tokio::test]
async fn book_in_the_past_is_refused() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100010").await;

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({
                    "user_id": user.id,
                    "start": { "date": "2020-01-01", "time": "10 am" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("already passed"));
    let booked = ledger
        .appointments_for_user(user.id, Some(AppointmentStatus::Booked))
        .await
        .expect("listing should succeed");
    assert!(booked.is_empty());
}

#[tokio::test]
async fn book_for_an_unknown_user_asks_to_identify_first() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({
                    "user_id": Uuid::new_v4(),
                    "start": { "date": "2030-01-07", "time": "10 am" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("No account matches that user id"));
}

#[tokio::test]
async fn modify_moves_and_keeps_the_duration() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100011").await;
    let appointment = ledger
        .book_appointment(user.id, monday(10), 30, None)
        .await
        .expect("booking should succeed");

    let outcome = dispatcher
        .dispatch(
            &request(
                "modify_appointment",
                json!({
                    "appointment_id": appointment.id,
                    "new_start": { "date": "2030-01-07", "time": "14:00" }
                }),
            ),
            &mut context,
        )
        .await;

    assert_eq!(
        outcome.sentence,
        "Moved the appointment from Monday, January 7 at 10:00 AM \
         to Monday, January 7 at 2:00 PM."
    );

    let moved = ledger
        .get_appointment(appointment.id)
        .await
        .expect("appointment should exist");
    assert_eq!(moved.starts_at, monday(14));
    assert_eq!(moved.duration_minutes, 30);
    assert_eq!(context.modified(), &[appointment.id]);
}

#[tokio::test]
async fn modify_conflict_leaves_the_original_in_place() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100012").await;
    let first = ledger
        .book_appointment(user.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");
    ledger
        .book_appointment(user.id, monday(11), 60, None)
        .await
        .expect("booking should succeed");

    let outcome = dispatcher
        .dispatch(
            &request(
                "modify_appointment",
                json!({
                    "appointment_id": first.id,
                    "new_start": { "date": "2030-01-07", "time": "11 am" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("11:00 AM is already booked"));
    let untouched = ledger
        .get_appointment(first.id)
        .await
        .expect("appointment should exist");
    assert_eq!(untouched.starts_at, monday(10));
    assert!(context.modified().is_empty());
}

#[tokio::test]
async fn modify_a_cancelled_appointment_suggests_rebooking() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100013").await;
    let appointment = ledger
        .book_appointment(user.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");
    ledger
        .cancel_appointment(appointment.id)
        .await
        .expect("cancellation should succeed");

    let outcome = dispatcher
        .dispatch(
            &request(
                "modify_appointment",
                json!({
                    "appointment_id": appointment.id,
                    "new_start": { "date": "2030-01-07", "time": "14:00" }
                }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("already cancelled"));
    assert!(outcome.sentence.contains("nothing to move"));
}

#[tokio::test]
async fn cancel_reports_once_then_idempotently() {
    let (_dir, ledger, dispatcher, mut context) = rig();
    let user = seeded_user(&ledger, "+15550100014").await;
    let appointment = ledger
        .book_appointment(user.id, monday(10), 60, None)
        .await
        .expect("booking should succeed");

    let first = dispatcher
        .dispatch(
            &request(
                "cancel_appointment",
                json!({ "appointment_id": appointment.id }),
            ),
            &mut context,
        )
        .await;
    assert_eq!(
        first.sentence,
        "Cancelled the appointment on Monday, January 7 at 10:00 AM."
    );
    assert_eq!(context.cancelled(), &[appointment.id]);

    let second = dispatcher
        .dispatch(
            &request(
                "cancel_appointment",
                json!({ "appointment_id": appointment.id }),
            ),
            &mut context,
        )
        .await;
    assert!(second.sentence.contains("already cancelled"));
    assert_eq!(context.cancelled(), &[appointment.id]);
}

#[tokio::test]
async fn cancel_unknown_id_explains_itself() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request(
                "cancel_appointment",
                json!({ "appointment_id": Uuid::new_v4() }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("No appointment matches that id"));
}

#[tokio::test]
async fn end_conversation_flags_the_farewell() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(&request("end_conversation", json!({})), &mut context)
        .await;

    assert!(outcome.end_call);
    assert_eq!(
        outcome.sentence,
        "Thanks for calling, and have a wonderful day!"
    );
}

#[tokio::test]
async fn unknown_tool_gets_a_spoken_refusal() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(&request("transfer_funds", json!({})), &mut context)
        .await;

    assert!(!outcome.end_call);
    assert!(outcome.sentence.contains("That action isn't available"));
}

#[tokio::test]
async fn invalid_arguments_name_the_problem_for_a_retry() {
    let (_dir, _ledger, dispatcher, mut context) = rig();

    let outcome = dispatcher
        .dispatch(
            &request(
                "book_appointment",
                json!({ "start": { "date": "tomorrow", "time": "2 pm" } }),
            ),
            &mut context,
        )
        .await;

    assert!(outcome.sentence.contains("didn't go through"));
    assert!(outcome.sentence.contains("user_id"));
}
