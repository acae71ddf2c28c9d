use anyhow::{Context, Result};
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed rendering JSON output")
}

#[cfg(test)]
mod tests {
    use super::render_json;
    use crate::risk::RiskLevel;

    #[test]
    fn renders_snake_case_enums() {
        let rendered = render_json(&[RiskLevel::Low, RiskLevel::High]).expect("render");
        assert_eq!(rendered, "[\n  \"low\",\n  \"high\"\n]");
    }
}
