//! The seven tools the model may call, and the dispatcher that runs them.
//!
//! Every tool resolves to a spoken-English sentence that is fed back to the
//! model as the tool result. Domain failures (slot conflicts, unknown ids,
//! bad phone numbers) become clarifying sentences rather than errors, so a
//! single confused tool call never ends the conversation. Ids the model
//! needs for follow-up calls ride along inside the sentences.

use chrono::{DateTime, NaiveDate, Utc};
use frontdesk_ledger::{Ledger, LedgerError};
use frontdesk_types::{AppointmentStatus, BusinessHours};
use frontdesk_voice::{ToolCallRequest, ToolSchema};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::context::SessionContext;
use crate::timeparse::{parse_spoken_date, parse_spoken_start, TimeParseError};

/// Why a tool request could not be executed as sent.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments did not deserialize into the tool's expected shape.
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments {
        tool: &'static str,
        message: String,
    },
}

/// A date and time as the caller said them, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpokenStart {
    pub date: String,
    pub time: String,
}

#[derive(Deserialize)]
struct IdentifyArgs {
    phone: String,
}

#[derive(Deserialize)]
struct CreateArgs {
    phone: String,
    name: String,
}

#[derive(Deserialize)]
struct AvailabilityArgs {
    #[serde(default)]
    from_date: Option<String>,
    #[serde(default)]
    to_date: Option<String>,
}

#[derive(Deserialize)]
struct BookArgs {
    user_id: Uuid,
    start: SpokenStart,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
    #[serde(default)]
    notes: Option<String>,
}

fn default_duration() -> u32 {
    60
}

#[derive(Deserialize)]
struct ModifyArgs {
    appointment_id: Uuid,
    new_start: SpokenStart,
}

#[derive(Deserialize)]
struct CancelArgs {
    appointment_id: Uuid,
}

fn decode<T: serde::de::DeserializeOwned>(
    tool: &'static str,
    arguments: &Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|e| ToolError::InvalidArguments {
        tool,
        message: e.to_string(),
    })
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    IdentifyUser {
        phone: String,
    },
    CreateUser {
        phone: String,
        name: String,
    },
    GetAvailability {
        from_date: Option<String>,
        to_date: Option<String>,
    },
    BookAppointment {
        user_id: Uuid,
        start: SpokenStart,
        duration_minutes: u32,
        notes: Option<String>,
    },
    ModifyAppointment {
        appointment_id: Uuid,
        new_start: SpokenStart,
    },
    CancelAppointment {
        appointment_id: Uuid,
    },
    EndConversation,
}

impl ToolCall {
    /// Validates a model tool request against the registry.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        match name {
            "identify_user" => decode::<IdentifyArgs>("identify_user", arguments)
                .map(|a| Self::IdentifyUser { phone: a.phone }),
            "create_user" => decode::<CreateArgs>("create_user", arguments).map(|a| {
                Self::CreateUser {
                    phone: a.phone,
                    name: a.name,
                }
            }),
            "get_availability" => decode::<AvailabilityArgs>("get_availability", arguments)
                .map(|a| Self::GetAvailability {
                    from_date: a.from_date,
                    to_date: a.to_date,
                }),
            "book_appointment" => decode::<BookArgs>("book_appointment", arguments).map(|a| {
                Self::BookAppointment {
                    user_id: a.user_id,
                    start: a.start,
                    duration_minutes: a.duration_minutes,
                    notes: a.notes.filter(|n| !n.trim().is_empty()),
                }
            }),
            "modify_appointment" => decode::<ModifyArgs>("modify_appointment", arguments).map(
                |a| Self::ModifyAppointment {
                    appointment_id: a.appointment_id,
                    new_start: a.new_start,
                },
            ),
            "cancel_appointment" => decode::<CancelArgs>("cancel_appointment", arguments).map(
                |a| Self::CancelAppointment {
                    appointment_id: a.appointment_id,
                },
            ),
            "end_conversation" => Ok(Self::EndConversation),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// The registry name for this call.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdentifyUser { .. } => "identify_user",
            Self::CreateUser { .. } => "create_user",
            Self::GetAvailability { .. } => "get_availability",
            Self::BookAppointment { .. } => "book_appointment",
            Self::ModifyAppointment { .. } => "modify_appointment",
            Self::CancelAppointment { .. } => "cancel_appointment",
            Self::EndConversation => "end_conversation",
        }
    }
}

/// Schemas for every registered tool, in the order the model sees them.
pub fn tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "identify_user",
            description: "Look up an existing caller by phone number. Returns their name, \
                          their user id, and any upcoming appointments.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "phone": {
                        "type": "string",
                        "description": "Phone number as the caller said it."
                    }
                },
                "required": ["phone"]
            }),
        },
        ToolSchema {
            name: "create_user",
            description: "Create an account for a new caller. Ask for their name first.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "phone": {
                        "type": "string",
                        "description": "Phone number for the new account."
                    },
                    "name": {
                        "type": "string",
                        "description": "The caller's name."
                    }
                },
                "required": ["phone", "name"]
            }),
        },
        ToolSchema {
            name: "get_availability",
            description: "List open appointment slots. Omit both dates to check today.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "from_date": {
                        "type": "string",
                        "description": "First day to check. Natural language is fine, \
                                        like 'tomorrow' or 'Friday'."
                    },
                    "to_date": {
                        "type": "string",
                        "description": "Last day to check. Defaults to from_date."
                    }
                },
                "required": []
            }),
        },
        ToolSchema {
            name: "book_appointment",
            description: "Book an appointment for an identified user.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "User id from identify_user or create_user."
                    },
                    "start": {
                        "type": "object",
                        "properties": {
                            "date": {
                                "type": "string",
                                "description": "Spoken date, like 'tomorrow' or 'September 3'."
                            },
                            "time": {
                                "type": "string",
                                "description": "Spoken time, like '2 PM' or '14:00'."
                            }
                        },
                        "required": ["date", "time"]
                    },
                    "duration_minutes": {
                        "type": "integer",
                        "description": "Length in minutes. Defaults to 60."
                    },
                    "notes": {
                        "type": "string",
                        "description": "Anything the caller wants on file for the visit."
                    }
                },
                "required": ["user_id", "start"]
            }),
        },
        ToolSchema {
            name: "modify_appointment",
            description: "Move an existing appointment to a new date and time. \
                          Its length stays the same.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "appointment_id": {
                        "type": "string",
                        "description": "Appointment id from an earlier tool result."
                    },
                    "new_start": {
                        "type": "object",
                        "properties": {
                            "date": {
                                "type": "string",
                                "description": "Spoken date to move to."
                            },
                            "time": {
                                "type": "string",
                                "description": "Spoken time to move to."
                            }
                        },
                        "required": ["date", "time"]
                    }
                },
                "required": ["appointment_id", "new_start"]
            }),
        },
        ToolSchema {
            name: "cancel_appointment",
            description: "Cancel an existing appointment.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "appointment_id": {
                        "type": "string",
                        "description": "Appointment id from an earlier tool result."
                    }
                },
                "required": ["appointment_id"]
            }),
        },
        ToolSchema {
            name: "end_conversation",
            description: "End the call once the caller is done. Say goodbye before calling this.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
    ]
}

/// What executing one tool produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Sentence fed back to the model as the tool result.
    pub sentence: String,
    /// Whether the tool asked to end the call.
    pub end_call: bool,
}

impl ToolOutcome {
    fn reply(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            end_call: false,
        }
    }

    fn farewell(sentence: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            end_call: true,
        }
    }
}

const NOT_FOUND: &str =
    "No appointment matches that id. Double-check it against the caller's upcoming appointments.";

/// Executes validated tool calls against the booking ledger.
///
/// Every failure mode resolves to a sentence, so `dispatch` itself never
/// errors. Infrastructure failures are logged and phrased as a polite
/// request to try again.
pub struct ToolDispatcher {
    ledger: Ledger,
    hours: BusinessHours,
}

impl ToolDispatcher {
    pub fn new(ledger: Ledger, hours: BusinessHours) -> Self {
        Self { ledger, hours }
    }

    /// Runs one model tool request and phrases the result.
    pub async fn dispatch(
        &self,
        request: &ToolCallRequest,
        context: &mut SessionContext,
    ) -> ToolOutcome {
        let call = match ToolCall::parse(&request.name, &request.arguments) {
            Ok(call) => call,
            Err(ToolError::UnknownTool(name)) => {
                tracing::warn!(tool = %name, "model requested an unregistered tool");
                return ToolOutcome::reply(
                    "That action isn't available. You can look up callers, check \
                     availability, and book, move, or cancel appointments.",
                );
            }
            Err(ToolError::InvalidArguments { tool, message }) => {
                tracing::warn!(tool, %message, "tool arguments failed validation");
                return ToolOutcome::reply(format!(
                    "That request didn't go through: {message}. Fix the arguments and try again."
                ));
            }
        };

        tracing::debug!(tool = call.name(), "executing tool call");
        match call {
            ToolCall::IdentifyUser { phone } => {
                ToolOutcome::reply(self.identify_user(context, &phone).await)
            }
            ToolCall::CreateUser { phone, name } => {
                ToolOutcome::reply(self.create_user(context, &phone, &name).await)
            }
            ToolCall::GetAvailability { from_date, to_date } => ToolOutcome::reply(
                self.availability(from_date.as_deref(), to_date.as_deref())
                    .await,
            ),
            ToolCall::BookAppointment {
                user_id,
                start,
                duration_minutes,
                notes,
            } => ToolOutcome::reply(
                self.book(context, user_id, &start, duration_minutes, notes)
                    .await,
            ),
            ToolCall::ModifyAppointment {
                appointment_id,
                new_start,
            } => ToolOutcome::reply(self.modify(context, appointment_id, &new_start).await),
            ToolCall::CancelAppointment { appointment_id } => {
                ToolOutcome::reply(self.cancel(context, appointment_id).await)
            }
            ToolCall::EndConversation => {
                ToolOutcome::farewell("Thanks for calling, and have a wonderful day!")
            }
        }
    }

    async fn identify_user(&self, context: &mut SessionContext, phone: &str) -> String {
        let user = match self.ledger.user_by_phone(phone).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return format!(
                    "No account found for {phone}. Ask the caller for their name, \
                     then create one."
                );
            }
            Err(LedgerError::InvalidPhone(_)) => {
                return "That phone number doesn't look right. Could you repeat it \
                        digit by digit?"
                    .to_string();
            }
            Err(err) => {
                return self.trouble(
                    "identify_user",
                    &err,
                    "I had trouble looking that number up. Could you try again in a moment?",
                );
            }
        };

        let upcoming = match self
            .ledger
            .appointments_for_user(user.id, Some(AppointmentStatus::Booked))
            .await
        {
            Ok(list) => list,
            Err(err) => {
                return self.trouble(
                    "identify_user",
                    &err,
                    "I found the account but couldn't load its appointments. \
                     Could you try again?",
                );
            }
        };

        let now = Utc::now();
        let listed: Vec<String> = upcoming
            .iter()
            .filter(|a| a.starts_at > now)
            .take(5)
            .map(|a| format!("{} (id {})", spoken_datetime(a.starts_at), a.id))
            .collect();

        let opener = match &user.display_name {
            Some(name) => format!("Found user {name} (user id {}).", user.id),
            None => format!("Found the account (user id {}), but no name is on file.", user.id),
        };
        context.user = Some(user);

        if listed.is_empty() {
            format!("{opener} No upcoming appointments.")
        } else {
            format!("{opener} Upcoming appointments: {}.", listed.join("; "))
        }
    }

    async fn create_user(&self, context: &mut SessionContext, phone: &str, name: &str) -> String {
        match self.ledger.create_user(phone, Some(name.to_string())).await {
            Ok(user) => {
                let sentence = format!("Created an account for {name} (user id {}).", user.id);
                context.user = Some(user);
                sentence
            }
            Err(LedgerError::DuplicatePhone(_)) => match self.ledger.user_by_phone(phone).await {
                Ok(Some(user)) => {
                    let sentence = match &user.display_name {
                        Some(existing) => format!(
                            "An account with that number already exists for {existing} \
                             (user id {}). Welcome them back.",
                            user.id
                        ),
                        None => format!(
                            "An account with that number already exists (user id {}).",
                            user.id
                        ),
                    };
                    context.user = Some(user);
                    sentence
                }
                _ => "An account with that number already exists.".to_string(),
            },
            Err(LedgerError::InvalidPhone(_)) => {
                "That phone number doesn't look right. Could you repeat it digit by digit?"
                    .to_string()
            }
            Err(err) => self.trouble(
                "create_user",
                &err,
                "I couldn't create that account just now. Could you try again?",
            ),
        }
    }

    async fn availability(&self, from_date: Option<&str>, to_date: Option<&str>) -> String {
        let today = Utc::now().date_naive();
        let from = match from_date {
            Some(raw) => match parse_spoken_date(raw, today) {
                Some(date) => date,
                None => return date_clarification(raw),
            },
            None => today,
        };
        let to = match to_date {
            Some(raw) => match parse_spoken_date(raw, today) {
                Some(date) => date,
                None => return date_clarification(raw),
            },
            None => from,
        };

        let slots = match self.ledger.available_slots(from, to, &self.hours).await {
            Ok(slots) => slots,
            Err(err) => {
                return self.trouble(
                    "get_availability",
                    &err,
                    "I couldn't check the calendar just now. Could you try again?",
                );
            }
        };

        let now = Utc::now();
        let open: Vec<_> = slots.into_iter().filter(|s| s.starts_at > now).collect();
        if open.is_empty() {
            return format!(
                "Nothing is open {}. Would another day work?",
                range_label(from, to, today)
            );
        }

        if from == to {
            let times: Vec<String> = open.iter().map(|s| spoken_time(s.starts_at)).collect();
            let label = day_label(from, today);
            return if times.len() == 1 {
                format!(
                    "There is one slot open {label}, at {}. Would the caller like it?",
                    times[0]
                )
            } else {
                format!(
                    "There are {} slots open {label}: {}. Which time works?",
                    times.len(),
                    join_spoken(&times)
                )
            };
        }

        // Slots arrive in start order, so consecutive runs share a day.
        let mut days: Vec<(NaiveDate, Vec<String>)> = Vec::new();
        for slot in &open {
            let date = slot.starts_at.date_naive();
            match days.last_mut() {
                Some((current, times)) if *current == date => {
                    times.push(spoken_time(slot.starts_at));
                }
                _ => days.push((date, vec![spoken_time(slot.starts_at)])),
            }
        }

        let shown: Vec<String> = days
            .iter()
            .take(3)
            .map(|(date, times)| format!("{}: {}", spoken_date(*date), join_spoken(times)))
            .collect();
        let mut sentence = format!("Open slots: {}.", shown.join("; "));
        if days.len() > 3 {
            sentence.push_str(" Later days have openings too.");
        }
        sentence.push_str(" Which day and time works?");
        sentence
    }

    async fn book(
        &self,
        context: &mut SessionContext,
        user_id: Uuid,
        start: &SpokenStart,
        duration_minutes: u32,
        notes: Option<String>,
    ) -> String {
        let begins = match self.coerce_start(start, duration_minutes) {
            Ok(at) => at,
            Err(sentence) => return sentence,
        };

        match self
            .ledger
            .book_appointment(user_id, begins, duration_minutes, notes)
            .await
        {
            Ok(appointment) => {
                context.note_booked(appointment.id);
                format!(
                    "Appointment confirmed for {} (id {}).",
                    spoken_datetime(appointment.starts_at),
                    appointment.id
                )
            }
            Err(LedgerError::SlotConflict) => self.conflict_reply(begins).await,
            Err(LedgerError::UserNotFound(_)) => {
                "No account matches that user id. Identify the caller first, then book."
                    .to_string()
            }
            Err(LedgerError::InvalidDuration) => {
                "The appointment length has to be a positive number of minutes.".to_string()
            }
            Err(err) => self.trouble(
                "book_appointment",
                &err,
                "I ran into a problem booking that. Could you try once more?",
            ),
        }
    }

    async fn modify(
        &self,
        context: &mut SessionContext,
        appointment_id: Uuid,
        new_start: &SpokenStart,
    ) -> String {
        let current = match self.ledger.get_appointment(appointment_id).await {
            Ok(appointment) => appointment,
            Err(LedgerError::AppointmentNotFound(_)) => return NOT_FOUND.to_string(),
            Err(err) => {
                return self.trouble(
                    "modify_appointment",
                    &err,
                    "I couldn't load that appointment just now. Could you try again?",
                );
            }
        };
        if current.status == AppointmentStatus::Cancelled {
            return "That appointment was already cancelled, so there's nothing to move. \
                    Would the caller like a fresh booking?"
                .to_string();
        }

        // The move keeps the appointment's existing length.
        let begins = match self.coerce_start(new_start, current.duration_minutes) {
            Ok(at) => at,
            Err(sentence) => return sentence,
        };

        match self
            .ledger
            .modify_appointment(appointment_id, begins, current.duration_minutes)
            .await
        {
            Ok(updated) => {
                context.note_modified(updated.id);
                format!(
                    "Moved the appointment from {} to {}.",
                    spoken_datetime(current.starts_at),
                    spoken_datetime(updated.starts_at)
                )
            }
            Err(LedgerError::SlotConflict) => self.conflict_reply(begins).await,
            Err(LedgerError::AppointmentNotFound(_)) => NOT_FOUND.to_string(),
            Err(err) => self.trouble(
                "modify_appointment",
                &err,
                "I ran into a problem moving that appointment. Could you try once more?",
            ),
        }
    }

    async fn cancel(&self, context: &mut SessionContext, appointment_id: Uuid) -> String {
        match self.ledger.cancel_appointment(appointment_id).await {
            Ok(cancelled) => {
                context.note_cancelled(cancelled.id);
                format!(
                    "Cancelled the appointment on {}.",
                    spoken_datetime(cancelled.starts_at)
                )
            }
            Err(LedgerError::AlreadyCancelled(_)) => {
                "That appointment was already cancelled. Nothing more to do.".to_string()
            }
            Err(LedgerError::AppointmentNotFound(_)) => NOT_FOUND.to_string(),
            Err(err) => self.trouble(
                "cancel_appointment",
                &err,
                "I ran into a problem cancelling that. Could you try once more?",
            ),
        }
    }

    /// Coerces a spoken start into a bookable instant, or explains why the
    /// caller needs to pick differently.
    fn coerce_start(&self, start: &SpokenStart, duration_minutes: u32) -> Result<DateTime<Utc>, String> {
        let today = Utc::now().date_naive();
        let begins = match parse_spoken_start(&start.date, &start.time, today) {
            Ok(at) => at,
            Err(TimeParseError::Date(raw)) => return Err(date_clarification(&raw)),
            Err(TimeParseError::Time(raw)) => return Err(time_clarification(&raw)),
        };
        if !self.hours.fits(begins, duration_minutes) {
            return Err(format!(
                "That time is outside business hours. We're open {}. \
                 Would a different time work?",
                self.hours.describe()
            ));
        }
        if begins < Utc::now() {
            return Err("That time has already passed. Could the caller pick something later?"
                .to_string());
        }
        Ok(begins)
    }

    async fn conflict_reply(&self, begins: DateTime<Utc>) -> String {
        let date = begins.date_naive();
        let now = Utc::now();
        let alternatives: Vec<String> = match self
            .ledger
            .available_slots(date, date, &self.hours)
            .await
        {
            Ok(slots) => slots
                .into_iter()
                .filter(|s| s.starts_at > now)
                .take(3)
                .map(|s| spoken_time(s.starts_at))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "alternative slot lookup failed");
                Vec::new()
            }
        };

        if alternatives.is_empty() {
            format!(
                "{} is already booked. Would a different time work?",
                spoken_time(begins)
            )
        } else {
            format!(
                "{} is already booked. How about {}?",
                spoken_time(begins),
                join_spoken(&alternatives)
            )
        }
    }

    fn trouble(&self, tool: &'static str, err: &LedgerError, sentence: &str) -> String {
        tracing::error!(tool, error = %err, "tool hit an infrastructure failure");
        sentence.to_string()
    }
}

fn date_clarification(raw: &str) -> String {
    format!(
        "I couldn't understand the date '{raw}'. Try something like 'tomorrow', \
         'Friday', or '2026-09-03'."
    )
}

fn time_clarification(raw: &str) -> String {
    format!("I couldn't understand the time '{raw}'. Try something like '2 PM' or '14:00'.")
}

fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "today".to_string()
    } else if Some(date) == today.succ_opt() {
        "tomorrow".to_string()
    } else {
        format!("on {}", spoken_date(date))
    }
}

fn range_label(from: NaiveDate, to: NaiveDate, today: NaiveDate) -> String {
    if from == to {
        day_label(from, today)
    } else {
        format!("between {} and {}", spoken_date(from), spoken_date(to))
    }
}

fn spoken_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

fn spoken_time(at: DateTime<Utc>) -> String {
    at.format("%-I:%M %p").to_string()
}

fn spoken_datetime(at: DateTime<Utc>) -> String {
    format!("{} at {}", spoken_date(at.date_naive()), spoken_time(at))
}

fn join_spoken(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}
