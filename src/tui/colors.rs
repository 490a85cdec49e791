//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::LeadStatus;
use crate::gantt::drag::Validity;

/// Valid drop preview, won leads
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Drop warnings, milestones
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Invalid drops, critical tasks, lost leads
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Pipeline board accent
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
/// Scheduled bars
pub const STEEL_BLUE: Color = Color::Rgb(70, 110, 160);
pub const WEEKEND: Color = Color::Rgb(38, 38, 38);

pub fn validity_color(validity: Validity) -> Color {
    match validity {
        Validity::Valid => DARK_GREEN,
        Validity::Warning => GOLD,
        Validity::Invalid => DARK_RED,
    }
}

pub fn stage_color(stage: LeadStatus) -> Color {
    match stage {
        LeadStatus::Won => DARK_GREEN,
        LeadStatus::Lost => DARK_RED,
        LeadStatus::Negotiation | LeadStatus::Proposal => GOLD,
        _ => DARK_PURPLE,
    }
}

/// Readable foreground on top of `bg`.
pub fn text_on(bg: Color) -> Color {
    match bg {
        GOLD => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
