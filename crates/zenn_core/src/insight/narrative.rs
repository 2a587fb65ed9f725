//! Fixed narrative tables for insight results.
//!
//! Each entry is looked up by classification value, so every sentence can be
//! tested on its own and none is produced by branching logic.

use crate::insight::feedback::FeedbackNarrative;
use crate::insight::pillars::PillarClass;
use crate::model::task::{Feedback, Pillar};

pub const INSUFFICIENT_DATA: &str =
    "Not enough completed tasks in this period to say anything yet.";

pub const HIGHEST_PILLAR_TEMPLATE: &str = "{pillar} is what drives your choices the most.";
pub const LOWEST_PILLAR_TEMPLATE: &str = "{pillar} is the pillar you feed the least.";

const PILLAR_NARRATIVES: [(Pillar, PillarClass, &str); 9] = [
    (
        Pillar::Consequence,
        PillarClass::HighPriority,
        "You mostly act under pressure: high-stakes tasks dominate your days.",
    ),
    (
        Pillar::Consequence,
        PillarClass::Balanced,
        "You weigh risk without letting it run your schedule.",
    ),
    (
        Pillar::Consequence,
        PillarClass::Neglected,
        "Few of your tasks carry real consequences; check nothing urgent is slipping.",
    ),
    (
        Pillar::Pride,
        PillarClass::HighPriority,
        "You pick tasks you are proud of. Keep celebrating those wins.",
    ),
    (
        Pillar::Pride,
        PillarClass::Balanced,
        "Pride shows up regularly without being your only motor.",
    ),
    (
        Pillar::Pride,
        PillarClass::Neglected,
        "Little of what you finish makes you proud; add one task that matters to you.",
    ),
    (
        Pillar::Construction,
        PillarClass::HighPriority,
        "You invest heavily in your own growth.",
    ),
    (
        Pillar::Construction,
        PillarClass::Balanced,
        "Personal growth has a steady place in your week.",
    ),
    (
        Pillar::Construction,
        PillarClass::Neglected,
        "Growth is being crowded out; schedule something that builds you up.",
    ),
];

const FEEDBACK_NARRATIVES: [(FeedbackNarrative, &str); 8] = [
    (
        FeedbackNarrative::NoFeedback,
        "No feedback recorded yet. Tag completed tasks to see how they felt.",
    ),
    (
        FeedbackNarrative::Balanced,
        "Your completed tasks feel evenly mixed between growth, relief and duty.",
    ),
    (
        FeedbackNarrative::Paired(Feedback::Transformed, Feedback::Relief),
        "Your tasks either change you or lift a weight off your shoulders.",
    ),
    (
        FeedbackNarrative::Paired(Feedback::Transformed, Feedback::Obligation),
        "You alternate between tasks that transform you and tasks you simply owe.",
    ),
    (
        FeedbackNarrative::Paired(Feedback::Relief, Feedback::Obligation),
        "Most tasks are about getting things off your plate.",
    ),
    (
        FeedbackNarrative::Single(Feedback::Transformed),
        "Most of what you complete transforms you.",
    ),
    (
        FeedbackNarrative::Single(Feedback::Relief),
        "Finishing tasks mostly brings you relief.",
    ),
    (
        FeedbackNarrative::Single(Feedback::Obligation),
        "Most tasks feel like obligations; look for ones you choose.",
    ),
];

pub fn pillar_narrative(pillar: Pillar, class: PillarClass) -> &'static str {
    PILLAR_NARRATIVES
        .iter()
        .find(|(p, c, _)| *p == pillar && *c == class)
        .map(|(_, _, text)| *text)
        .unwrap_or(INSUFFICIENT_DATA)
}

pub fn feedback_narrative(narrative: FeedbackNarrative) -> &'static str {
    FEEDBACK_NARRATIVES
        .iter()
        .find(|(n, _)| *n == narrative)
        .map(|(_, text)| *text)
        .unwrap_or(INSUFFICIENT_DATA)
}

/// Fills `{pillar}` in a template with the pillar label.
pub fn render_pillar_template(template: &str, pillar: Pillar) -> String {
    template.replace("{pillar}", pillar.label())
}
