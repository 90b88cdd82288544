use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Terminal progress display for a threaded run
///
/// One overall bar plus a bar per worker showing how many items that worker
/// has finished. Cloning shares the same bars.
#[derive(Clone)]
pub struct RunProgress {
    multi_progress: MultiProgress,
    overall_bar: ProgressBar,
    worker_bars: Vec<ProgressBar>,
    worker_counts: Arc<Vec<AtomicUsize>>,
}

impl RunProgress {
    pub fn new(total_items: usize, worker_count: usize) -> Self {
        let multi_progress = MultiProgress::new();

        let worker_colors = ["cyan/blue", "green/yellow", "magenta/red", "yellow/blue"];
        let worker_bars = (0..worker_count)
            .map(|worker_id| {
                let color = worker_colors[worker_id % worker_colors.len()];
                let template = format!(
                    "[Worker {}] {{bar:30.{}}} {{pos:>5}} items {{spinner}}",
                    worker_id + 1,
                    color
                );
                let bar = multi_progress.add(ProgressBar::new_spinner());
                bar.set_style(styled(&template));
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            })
            .collect();

        let overall_bar = multi_progress.add(ProgressBar::new(total_items as u64));
        overall_bar.set_style(styled(
            "Overall:   [{elapsed_precise}] {bar:40.bright_white/dim} {pos:>5}/{len:5} ({percent}%)",
        ));

        let worker_counts = (0..worker_count).map(|_| AtomicUsize::new(0)).collect();

        Self {
            multi_progress,
            overall_bar,
            worker_bars,
            worker_counts: Arc::new(worker_counts),
        }
    }

    /// Record one finished item; matches the executor's progress callback
    pub fn update(&self, completed: usize, _total: usize, worker_id: usize) {
        self.overall_bar.set_position(completed as u64);

        if let (Some(bar), Some(count)) = (
            self.worker_bars.get(worker_id),
            self.worker_counts.get(worker_id),
        ) {
            let done = count.fetch_add(1, Ordering::Relaxed) + 1;
            bar.set_position(done as u64);
        }
    }

    /// Executor callback driving this display
    pub fn reporter(&self) -> impl Fn(usize, usize, usize) + Send + Sync + 'static {
        let progress = self.clone();
        move |completed, total, worker_id| progress.update(completed, total, worker_id)
    }

    pub fn finish(&self) {
        for bar in &self.worker_bars {
            bar.finish();
        }
        self.overall_bar.finish();
        let _ = self.multi_progress.clear();
    }
}

fn styled(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}
