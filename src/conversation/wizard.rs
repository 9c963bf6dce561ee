//! Step-by-step publication of a property (or a request) over chat.

use tracing::{debug, info};

use crate::alerts::price::normalize_price;
use crate::conversation::intents::{is_affirmative, is_cancel, is_negative};
use crate::conversation::messages;
use crate::conversation::state::{ConversationContext, Question};
use crate::location::LocationNormalizer;
use crate::models::{Currency, ListingPayload};
use crate::text::normalize_text;

/// Result of feeding one answer to the wizard
#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Ask (or ask again); the context already points at the right step
    Prompt(String),
    /// Confirmed publication, ready for the listings service
    Submit(ListingPayload),
    Cancelled,
    /// Free-text request details to classify and store
    RequestDetails(String),
}

/// Enter the wizard at its first question
pub fn start(ctx: &mut ConversationContext) -> String {
    ctx.reset();
    ctx.last_question = Some(Question::PublicationType);
    messages::PUBLICATION_TYPE_QUESTION.to_string()
}

fn ask(ctx: &mut ConversationContext, next: Question, prompt: &str) -> WizardOutcome {
    ctx.last_question = Some(next);
    WizardOutcome::Prompt(prompt.to_string())
}

fn reprompt(text: &str) -> WizardOutcome {
    WizardOutcome::Prompt(text.to_string())
}

/// Apply an answer to the step the context is waiting on.
///
/// `answer` is the user's text with formatting stripped and case preserved.
/// Invalid answers keep the current step and explain what is expected.
pub fn advance(ctx: &mut ConversationContext, answer: &str, normalizer: &LocationNormalizer) -> WizardOutcome {
    let Some(step) = ctx.last_question.filter(Question::is_wizard_step) else {
        return WizardOutcome::Prompt(start(ctx));
    };

    if is_cancel(answer) {
        info!(step = step.as_str(), "Publication cancelled by user");
        ctx.reset();
        return WizardOutcome::Cancelled;
    }

    let answer = answer.trim();
    if answer.is_empty() {
        return reprompt(messages::EMPTY_ANSWER);
    }
    debug!(step = step.as_str(), "Wizard answer received");

    match step {
        Question::PublicationType => match normalize_text(answer).as_str() {
            "1" | "propiedad" | "una propiedad" => ask(ctx, Question::Title, messages::ASK_TITLE),
            "2" | "solicitud" | "una solicitud" => {
                ask(ctx, Question::RequestDetails, messages::ASK_REQUEST_DETAILS)
            }
            _ => reprompt(messages::PUBLICATION_TYPE_REPROMPT),
        },
        Question::Title => {
            ctx.draft.title = Some(answer.to_string());
            ask(ctx, Question::Description, messages::ASK_DESCRIPTION)
        }
        Question::Description => {
            ctx.draft.description = Some(answer.to_string());
            ask(ctx, Question::Transaction, messages::ASK_TRANSACTION)
        }
        Question::Transaction => {
            ctx.draft.operation = Some(canonical_operation(answer));
            ask(ctx, Question::Category, messages::ASK_CATEGORY)
        }
        Question::Category => {
            ctx.draft.category = Some(answer.to_string());
            ask(ctx, Question::Price, messages::ASK_PRICE)
        }
        Question::Price => match parse_price(answer) {
            Some((price, currency)) => {
                ctx.draft.price = Some(price);
                ctx.draft.currency = Some(currency);
                ask(ctx, Question::Location, messages::ASK_LOCATION)
            }
            None => reprompt(messages::INVALID_PRICE),
        },
        Question::Location => {
            let location = normalizer.normalize_location(Some(answer), None);
            ctx.draft.commune = location.commune.or_else(|| Some(answer.to_string()));
            ask(ctx, Question::Area, messages::ASK_AREA)
        }
        Question::Area => match first_number(answer).filter(|area| *area > 0.0) {
            Some(area) => {
                ctx.draft.area_m2 = Some(area);
                ask(ctx, Question::Rooms, messages::ASK_ROOMS)
            }
            None => reprompt(messages::INVALID_AREA),
        },
        Question::Rooms => match parse_rooms(answer) {
            Some((bedrooms, bathrooms, parking)) => {
                ctx.draft.bedrooms = Some(bedrooms);
                ctx.draft.bathrooms = Some(bathrooms);
                ctx.draft.parking = Some(parking);
                ask(ctx, Question::Features, messages::ASK_FEATURES)
            }
            None => reprompt(messages::INVALID_ROOMS),
        },
        Question::Features => {
            ctx.draft.features = Some(answer.to_string());
            let summary = messages::confirmation(&ctx.draft);
            ask(ctx, Question::Confirmation, &summary)
        }
        Question::Confirmation => {
            if is_affirmative(answer) {
                let draft = std::mem::take(&mut ctx.draft);
                ctx.reset();
                match draft.into_payload() {
                    Some(payload) => WizardOutcome::Submit(payload),
                    None => WizardOutcome::Cancelled,
                }
            } else if is_negative(answer) {
                ctx.reset();
                WizardOutcome::Cancelled
            } else {
                reprompt(messages::CONFIRM_REPROMPT)
            }
        }
        Question::RequestDetails => {
            ctx.reset();
            WizardOutcome::RequestDetails(answer.to_string())
        }
        Question::CreateAlert => WizardOutcome::Prompt(start(ctx)),
    }
}

fn canonical_operation(answer: &str) -> String {
    let normalized = normalize_text(answer);
    if normalized.starts_with("vent") || normalized.starts_with("vend") {
        "Venta".to_string()
    } else if normalized.starts_with("arr") || normalized.starts_with("alquil") {
        "Arriendo".to_string()
    } else {
        answer.to_string()
    }
}

/// Amount plus currency: UF when the answer says so, CLP otherwise
fn parse_price(answer: &str) -> Option<(f64, Currency)> {
    let price = normalize_price(Some(answer)).filter(|p| *p > 0.0)?;
    let currency = if normalize_text(answer)
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "uf")
    {
        Currency::Uf
    } else {
        Currency::Clp
    };
    Some((price, currency))
}

/// First number in the text, read with the same separators as prices:
/// `.` groups thousands and `,` marks decimals.
fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token = text[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .next()?
        .trim_end_matches(|c| c == '.' || c == ',');
    normalize_price(Some(token))
}

/// Bedrooms, bathrooms and parking spots: the first three integers
fn parse_rooms(answer: &str) -> Option<(u32, u32, u32)> {
    let numbers: Vec<u32> = answer
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();
    match numbers.as_slice() {
        [bedrooms, bathrooms, parking, ..] => Some((*bedrooms, *bathrooms, *parking)),
        _ => None,
    }
}
