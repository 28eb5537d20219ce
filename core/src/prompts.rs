//! Prompt context handed to multimodal model backends

use crate::ingest::{MediaFrame, VideoSource};
use crate::types::{
    AnalysisMode, DiagnosticReport, DiagnosticRequest, GuardianReport, LemonReport,
};

pub const MECHANIC_ROLE: &str = "You are a mechanical diagnostic expert. \
    Detect anomalies in engine sound and cross-reference with provided repair quotes.";

pub const SCEPTIC_ROLE: &str = "You are a car vetting agent. \
    Watch video feeds for 'Blue Smoke' or 'Uneven Idle'. Assign a Lemon Score 0-100.";

pub const GUARDIAN_ROLE: &str = "You are a Malaysian road safety agent. Context: Act 1987. \
    Analyze accident photos for plates and road tax. Command user clearly.";

/// Role prompt for a mode
pub fn role(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Mechanic => MECHANIC_ROLE,
        AnalysisMode::Sceptic => SCEPTIC_ROLE,
        AnalysisMode::Guardian => GUARDIAN_ROLE,
    }
}

fn schema(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Mechanic => DiagnosticReport::json_schema_example(),
        AnalysisMode::Sceptic => LemonReport::json_schema_example(),
        AnalysisMode::Guardian => GuardianReport::json_schema_example(),
    }
}

/// Full system instruction: role, output schema and answering rules
pub fn system_instruction(mode: AnalysisMode) -> String {
    format!(
        "{}\n\nReturn your answer strictly as a single JSON object matching this schema:\n{}\n\n\
         Instructions:\n\
         - Only report what the evidence supports. Do not invent findings\n\
         - Keep every string short enough to read on a phone screen\n\
         - Do not wrap the JSON in markdown",
        role(mode),
        schema(mode)
    )
}

/// User turn for an engine-sound diagnosis
pub fn mechanic_prompt(request: &DiagnosticRequest) -> String {
    let mut prompt = format!(
        "Analyze for mechanical failure.\n\nEngine sound description:\n{}",
        request.audio_description
    );
    match &request.quote_data {
        Some(quote) => {
            prompt.push_str("\n\nRepair quote received by the owner:\n");
            prompt.push_str(quote);
        }
        None => prompt.push_str(
            "\n\nNo repair quote was provided; \
             rate fraud_risk LOW unless the sound alone suggests tampering.",
        ),
    }
    prompt
}

/// User turn for a used-car vetting
pub fn sceptic_prompt(source: &VideoSource) -> String {
    match source {
        VideoSource::Remote(url) => format!("Analyze listing video: {}", url),
        VideoSource::Reference(reference) => format!("Analyze listing: {}", reference),
    }
}

/// Text accompanying an accident-scene frame
pub fn guardian_prompt(frame: &MediaFrame) -> String {
    if frame.is_image() {
        "Analyze this accident scene frame. Read any number plates and road tax details, \
         then tell the user what to capture next."
            .to_string()
    } else {
        "The uploaded frame could not be read as an image. Tell the user how to retake it."
            .to_string()
    }
}
