use crate::app::LoopMetricsSnapshot;

use super::text::{
    draw_filled_rect, draw_rect_outline, draw_text_clipped, text_width_px, LINE_ADVANCE,
    TEXT_SCALE,
};

const OVERLAY_PADDING: i32 = 6 * TEXT_SCALE;
const PANEL_INSET_X: i32 = 4 * TEXT_SCALE;
const PANEL_INSET_Y: i32 = 3 * TEXT_SCALE;
const TEXT_PRIMARY_COLOR: [u8; 4] = [244, 248, 252, 255];
const TEXT_DIM_COLOR: [u8; 4] = [176, 198, 220, 255];
const PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 210];
const PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];
const TOAST_BG_COLOR: [u8; 4] = [28, 96, 64, 230];
const TOAST_TEXT_COLOR: [u8; 4] = [236, 255, 244, 255];
const PERF_SECTION_LABEL: &str = "Perf";
const SCENE_SECTION_LABEL: &str = "Scene";
const EFFECTS_SECTION_LABEL: &str = "Effects";
const AUDIO_SECTION_LABEL: &str = "Audio";

#[derive(Debug, Clone, Default)]
pub(crate) struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub render_fps_cap: Option<u32>,
    pub slow_frame_delay_ms: u64,
    pub object_count: usize,
    pub scene_lines: Vec<String>,
    pub recent_cues: Vec<String>,
}

pub(crate) fn build_overlay_lines(data: &OverlayData) -> Vec<String> {
    let cap_text = match data.render_fps_cap {
        Some(value) => value.to_string(),
        None => "inf".to_string(),
    };
    let mut lines = vec![
        PERF_SECTION_LABEL.to_string(),
        format!(
            "[{:.0} / {}] dbg+{}ms",
            data.metrics.fps, cap_text, data.slow_frame_delay_ms
        ),
        format!("TPS: {:.1}", data.metrics.tps),
        format!("Frame: {:.2} ms", data.metrics.frame_time_ms),
        format!("Dropped ticks: {}", data.metrics.dropped_ticks),
        String::new(),
        SCENE_SECTION_LABEL.to_string(),
        format!("Objects: {}", data.object_count),
    ];
    lines.extend(data.scene_lines.iter().cloned());

    let effects = &data.metrics.session_effects;
    lines.extend([
        String::new(),
        EFFECTS_SECTION_LABEL.to_string(),
        format!(
            "Cues: {} ({} rejected)",
            effects.cues_played, effects.cues_rejected
        ),
        format!(
            "Platform: {} sent, {} failed",
            effects.platform_requests, effects.platform_failures
        ),
        format!("Toasts: {}", effects.toasts_raised),
    ]);

    if !data.recent_cues.is_empty() {
        lines.push(String::new());
        lines.push(AUDIO_SECTION_LABEL.to_string());
        lines.push(data.recent_cues.join(" "));
    }
    lines
}

fn line_color(line: &str) -> [u8; 4] {
    if matches!(
        line,
        PERF_SECTION_LABEL | SCENE_SECTION_LABEL | EFFECTS_SECTION_LABEL | AUDIO_SECTION_LABEL
    ) {
        TEXT_DIM_COLOR
    } else {
        TEXT_PRIMARY_COLOR
    }
}

pub(crate) fn draw_overlay(frame: &mut [u8], width: u32, height: u32, data: &OverlayData) {
    if width == 0 || height == 0 {
        return;
    }

    let lines = build_overlay_lines(data);
    let longest = lines
        .iter()
        .map(|line| text_width_px(line))
        .max()
        .unwrap_or(0);
    let panel_left = OVERLAY_PADDING - PANEL_INSET_X;
    let panel_top = OVERLAY_PADDING - PANEL_INSET_Y;
    let panel_width = longest + PANEL_INSET_X * 2;
    let panel_height = lines.len() as i32 * LINE_ADVANCE + PANEL_INSET_Y * 2;
    draw_filled_rect(
        frame,
        width,
        height,
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        PANEL_BG_COLOR,
    );
    draw_rect_outline(
        frame,
        width,
        height,
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        PANEL_BORDER_COLOR,
    );

    let mut y = OVERLAY_PADDING;
    for line in &lines {
        draw_text_clipped(frame, width, height, OVERLAY_PADDING, y, line, line_color(line));
        y += LINE_ADVANCE;
    }
}

/// Stacks toast messages bottom-centre, newest lowest.
pub(crate) fn draw_toasts(frame: &mut [u8], width: u32, height: u32, messages: &[&str]) {
    if width == 0 || height == 0 {
        return;
    }

    let mut y = height as i32 - OVERLAY_PADDING - LINE_ADVANCE;
    for message in messages.iter().rev() {
        let text_width = text_width_px(message);
        let x = (width as i32 - text_width) / 2;
        draw_filled_rect(
            frame,
            width,
            height,
            x - PANEL_INSET_X,
            y - PANEL_INSET_Y,
            text_width + PANEL_INSET_X * 2,
            LINE_ADVANCE + PANEL_INSET_Y,
            TOAST_BG_COLOR,
        );
        draw_text_clipped(frame, width, height, x, y, message, TOAST_TEXT_COLOR);
        y -= LINE_ADVANCE + PANEL_INSET_Y * 2;
    }
}
