//! Rendering statistics.

use std::time::Duration;

use crate::culling::{VisibilityFrustum, VisibilityStats};

use super::timing::FrameTiming;

/// Counters accumulated by the render thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    /// Frames rendered and presented.
    pub frames: u64,
    /// Draw calls over all frames.
    pub draw_calls: u64,
    /// Shadow-pass draw calls over all frames.
    pub shadow_draw_calls: u64,
    /// UI commands drawn over all frames.
    pub ui_commands: u64,
    /// Swapchain recreations.
    pub resizes: u32,
    /// Visibility counters of the last frame.
    pub last_visibility: VisibilityStats,
    /// CPU time of the last collected frame in milliseconds.
    pub frame_time_ms: f32,
    /// GPU time of the last collected frame in milliseconds, if the
    /// backend reports it.
    pub gpu_time_ms: Option<f32>,
    /// Worst collected CPU frame time in milliseconds.
    pub worst_frame_time_ms: f32,
}

impl RenderStats {
    /// Returns FPS calculated from frame time.
    #[must_use]
    pub fn fps(&self) -> f32 {
        if self.frame_time_ms > 0.0 {
            1000.0 / self.frame_time_ms
        } else {
            0.0
        }
    }

    /// Instances visible to the camera in the last frame.
    #[must_use]
    pub fn last_visible(&self) -> u32 {
        self.last_visibility.visible[VisibilityFrustum::Main.index()]
    }

    /// Records a finished frame.
    pub fn record_frame(&mut self, draw_calls: u32, shadow_draw_calls: u32, ui_commands: u32) {
        self.frames += 1;
        self.draw_calls += u64::from(draw_calls);
        self.shadow_draw_calls += u64::from(shadow_draw_calls);
        self.ui_commands += u64::from(ui_commands);
    }

    /// Records a collected timing.
    pub fn record_timing(&mut self, timing: &FrameTiming) {
        self.frame_time_ms = millis(timing.cpu);
        self.gpu_time_ms = timing.gpu.map(millis);
        self.worst_frame_time_ms = self.worst_frame_time_ms.max(self.frame_time_ms);
    }
}

fn millis(d: Duration) -> f32 {
    d.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut stats = RenderStats::default();
        assert_eq!(stats.fps(), 0.0);

        stats.record_frame(10, 4, 2);
        stats.record_frame(5, 0, 1);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.draw_calls, 15);
        assert_eq!(stats.shadow_draw_calls, 4);
        assert_eq!(stats.ui_commands, 3);

        stats.record_timing(&FrameTiming {
            frame: 1,
            cpu: Duration::from_millis(10),
            gpu: None,
        });
        stats.record_timing(&FrameTiming {
            frame: 2,
            cpu: Duration::from_millis(4),
            gpu: Some(Duration::from_millis(2)),
        });
        assert!((stats.fps() - 250.0).abs() < 0.5);
        assert!((stats.worst_frame_time_ms - 10.0).abs() < 1e-3);
        assert!(stats.gpu_time_ms.is_some());
    }
}
