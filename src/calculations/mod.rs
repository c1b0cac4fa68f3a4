pub mod slack;

pub use slack::{MicrosoftSlackCalculator, SlackCalculator, TotalSlackCalculationType};
