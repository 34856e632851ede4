//! Progress reporting with indicatif

use dcflash_loader::{FlashProgress, Phase};
use indicatif::{ProgressBar, ProgressStyle};

/// Create a page progress bar with a phase message
fn create_progress_bar_with_phase(
    total: u64,
    phase: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} pages ({{per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Writing => "Writing",
        Phase::Verifying => "Verifying",
        Phase::Reading => "Reading",
    }
}

/// Progress reporter using indicatif progress bars
#[derive(Default)]
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlashProgress for IndicatifProgress {
    fn start(&mut self, phase: Phase, total_pages: usize) {
        let total = total_pages as u64;
        let name = phase_name(phase);
        let pb = create_progress_bar_with_phase(total, name)
            .unwrap_or_else(|_| ProgressBar::new(total));
        self.current_bar = Some(pb);
    }

    fn page_done(&mut self, _page: u16, done: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(done as u64);
        }
    }

    fn finish(&mut self, phase: Phase) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish();
        }
        log::debug!("{} complete", phase_name(phase));
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // Leave a failed transfer's bar where it stopped
        if let Some(pb) = self.current_bar.take() {
            pb.abandon();
        }
    }
}
