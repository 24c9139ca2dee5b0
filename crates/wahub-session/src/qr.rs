// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QR rendering for pairing.

use qrcode::QrCode;
use qrcode::render::{svg, unicode};

use wahub_core::EngineError;

/// Renders the pairing payload as a terminal-friendly block QR.
pub fn render_terminal(raw: &str) -> Result<String, EngineError> {
    let code = QrCode::new(raw.as_bytes())
        .map_err(|err| EngineError::Internal(format!("qr encoding failed: {err}")))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}

/// Renders the pairing payload as an SVG image, used for screenshots while
/// a session waits for a scan.
pub fn render_svg(raw: &str) -> Result<Vec<u8>, EngineError> {
    let code = QrCode::new(raw.as_bytes())
        .map_err(|err| EngineError::Internal(format!("qr encoding failed: {err}")))?;
    let image = code
        .render()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(image.into_bytes())
}

/// Formats a raw pairing code as the `ABCD-ABCD` the UI shows.
pub fn format_pairing_code(code: &str) -> String {
    let cleaned: String = code.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.len() == 8 {
        format!("{}-{}", &cleaned[..4], &cleaned[4..])
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_artifact_forms() {
        let raw = "2@abcdefghijklmnopqrstuvwxyz,ABCDEF,1234";
        let terminal = render_terminal(raw).unwrap();
        assert!(!terminal.is_empty());
        let svg = render_svg(raw).unwrap();
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));
    }

    #[test]
    fn pairing_code_grouping() {
        assert_eq!(format_pairing_code("ABCDEFGH"), "ABCD-EFGH");
        assert_eq!(format_pairing_code("ABCD-EFGH"), "ABCD-EFGH");
        assert_eq!(format_pairing_code("ABC"), "ABC");
    }
}
