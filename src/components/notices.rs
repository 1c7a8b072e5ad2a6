// ============================================================================
// NOTICES — short-lived status messages in the bottom-right corner
// ============================================================================

use eframe::egui;
use egui::{Color32, RichText};

/// How long a notice stays on screen, in seconds.
pub const NOTICE_SECONDS: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    /// egui input time at which the notice expires.
    pub expires_at: f64,
}

#[derive(Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn info(&mut self, now: f64, text: impl Into<String>) {
        self.push(now, text.into(), NoticeKind::Info);
    }

    /// Error notices are mirrored into the session log.
    pub fn error(&mut self, now: f64, text: impl Into<String>) {
        let text = text.into();
        log::error!("{}", text);
        self.push(now, text, NoticeKind::Error);
    }

    fn push(&mut self, now: f64, text: String, kind: NoticeKind) {
        self.items.push(Notice {
            text,
            kind,
            expires_at: now + NOTICE_SECONDS,
        });
    }

    /// Drop expired notices.
    pub fn prune(&mut self, now: f64) {
        self.items.retain(|n| n.expires_at > now);
    }

    pub fn active(&self) -> &[Notice] {
        &self.items
    }

    /// Seconds until the next notice expires.
    pub fn next_expiry(&self, now: f64) -> Option<f64> {
        self.items
            .iter()
            .map(|n| (n.expires_at - now).max(0.0))
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        self.prune(now);
        if self.items.is_empty() {
            return;
        }

        egui::Area::new("notices")
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .interactable(false)
            .show(ctx, |ui| {
                for notice in &self.items {
                    let (fill, text) = match notice.kind {
                        NoticeKind::Info => (Color32::from_rgb(40, 44, 52), Color32::WHITE),
                        NoticeKind::Error => (Color32::from_rgb(150, 40, 40), Color32::WHITE),
                    };
                    egui::Frame::none()
                        .fill(fill)
                        .rounding(6.0)
                        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                        .show(ui, |ui| {
                            ui.label(RichText::new(&notice.text).color(text));
                        });
                    ui.add_space(6.0);
                }
            });

        if let Some(wait) = self.next_expiry(now) {
            ctx.request_repaint_after(std::time::Duration::from_secs_f64(wait));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_expire_after_three_seconds() {
        let mut n = Notices::default();
        n.info(10.0, "Copied slice_1_1.png");
        n.error(11.0, "clipboard unavailable");
        assert_eq!(n.active().len(), 2);
        assert_eq!(n.next_expiry(10.5), Some(2.5));

        n.prune(13.0);
        assert_eq!(n.active().len(), 1);
        assert_eq!(n.active()[0].kind, NoticeKind::Error);

        n.prune(14.0);
        assert!(n.active().is_empty());
        assert_eq!(n.next_expiry(14.0), None);
    }
}
