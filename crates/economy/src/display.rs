//! Periodic projections of the strategy environment

use crate::config::DisplayConfig;
use curators_core::Result;
use curators_evolution::StratEnvironment;
use curators_evolution::projection::{probs_structure, strat_structure};
use curators_report::{ProjectedData, SinkKind};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Display {
    strats: ProjectedData,
    probs: ProjectedData,
    points_num: usize,
    heatmap: bool,
}

impl Display {
    /// Sinks for `strats`; plot tables go under `plot_dir`
    pub fn new(config: &DisplayConfig, strats: &StratEnvironment, plot_dir: &Path) -> Self {
        let kind = |console: bool, sub: &str| {
            if console {
                SinkKind::ConsoleSummary
            } else {
                SinkKind::Plot {
                    directory: plot_dir.join(sub),
                }
            }
        };

        let mut strat_sink = ProjectedData::new(kind(config.strat.console, "strat"));
        strat_sink.init(strat_structure(), true);
        let mut probs_sink = ProjectedData::new(kind(config.probs.console, "probs"));
        probs_sink.init(
            probs_structure(strats.populations().len(), config.probs.heatmap),
            false,
        );

        Self {
            strats: strat_sink,
            probs: probs_sink,
            points_num: config.probs.points_num,
            heatmap: config.probs.heatmap,
        }
    }

    pub fn show(&mut self, strats: &StratEnvironment) -> Result<()> {
        strats.send_strats(&mut self.strats)?;
        self.strats.render()?;
        strats.send_probs(&mut self.probs, self.points_num, self.heatmap)?;
        self.probs.render()
    }
}
