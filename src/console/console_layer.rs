// Console layer - a plain-text stand-in for a chat front end.
// Reads submissions from stdin and prints verdicts; no history is kept.

pub mod formatter;
pub mod session;
