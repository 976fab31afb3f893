//! Text renderers for aggregation reports

pub mod graph;
pub mod table;

pub use graph::GraphLayout;
pub use table::TableView;

use crate::types::Result;

/// A view that renders to plain text
pub trait Render {
    fn render(&self) -> Result<String>;

    fn print(&self) -> Result<()> {
        print!("{}", self.render()?);
        Ok(())
    }
}

/// Shortest decimal form with at most two fraction digits
/// Example: 1000.0 → "1000", 10.5 → "10.5", 0.25 → "0.25"
pub fn format_value(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Two fixed decimals; negative zero prints as "0.00"
pub fn format_fixed(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    if fixed == "-0.00" {
        "0.00".to_string()
    } else {
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_whole() {
        assert_eq!(format_value(1000.0), "1000");
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(0.0), "0");
    }

    #[test]
    fn test_format_value_fraction() {
        assert_eq!(format_value(10.5), "10.5");
        assert_eq!(format_value(170.2), "170.2");
        assert_eq!(format_value(0.05), "0.05");
    }

    #[test]
    fn test_format_value_negative() {
        assert_eq!(format_value(-3.2), "-3.2");
        assert_eq!(format_value(-0.0), "0");
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(12.5), "12.50");
        assert_eq!(format_fixed(-3.2), "-3.20");
        assert_eq!(format_fixed(-0.0), "0.00");
        assert_eq!(format_fixed(-0.001), "0.00");
    }
}
