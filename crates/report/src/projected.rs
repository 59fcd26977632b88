use curators_core::{Error, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Where rendered projections go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    ConsoleSummary,
    Plot { directory: PathBuf },
}

/// Declared projection: a name plus its coordinate labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSpec {
    pub name: String,
    pub coords: Vec<String>,
}

impl ProjectionSpec {
    pub fn new(name: impl Into<String>, coords: &[&str]) -> Self {
        Self {
            name: name.into(),
            coords: coords.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    spec: ProjectionSpec,
    rows: Vec<Vec<f64>>,
}

impl Projection {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Mean of coordinate `index` over all rows
    pub fn mean(&self, index: usize) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let sum: f64 = self.rows.iter().filter_map(|row| row.get(index)).sum();
        Some(sum / self.rows.len() as f64)
    }
}

/// Row-oriented buffer of named projections bound to one sink
#[derive(Debug, Clone)]
pub struct ProjectedData {
    kind: SinkKind,
    colored: bool,
    projections: Vec<Projection>,
    index: HashMap<String, usize>,
    cursor: usize,
}

impl ProjectedData {
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            colored: false,
            projections: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
        }
    }

    /// Declare the projections. Colored data carries one extra trailing
    /// coordinate per row: the group the point belongs to.
    pub fn init(&mut self, structure: Vec<ProjectionSpec>, colored: bool) {
        self.colored = colored;
        self.index = structure
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name.clone(), i))
            .collect();
        self.projections = structure
            .into_iter()
            .map(|spec| Projection {
                spec,
                rows: Vec::new(),
            })
            .collect();
        self.cursor = 0;
    }

    /// Rewind to the first point
    pub fn start_sending(&mut self) {
        self.cursor = 0;
    }

    /// Fill the current point of projection `name`
    pub fn set(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let &slot = self
            .index
            .get(name)
            .ok_or_else(|| Error::shape(format!("unknown projection `{name}`")))?;
        let projection = &mut self.projections[slot];

        let width = projection.spec.coords.len() + usize::from(self.colored);
        if values.len() != width {
            return Err(Error::shape(format!(
                "projection `{name}` expects {width} values, got {}",
                values.len()
            )));
        }

        // the first point of a round discards the previous round
        if self.cursor == 0 {
            projection.rows.clear();
        }
        if projection.rows.len() <= self.cursor {
            projection.rows.resize(self.cursor + 1, vec![0.0; width]);
        }
        projection.rows[self.cursor] = values;
        Ok(())
    }

    /// Move to the next point
    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn projection(&self, name: &str) -> Option<&Projection> {
        self.index.get(name).map(|&i| &self.projections[i])
    }

    pub fn render(&self) -> Result<()> {
        match &self.kind {
            SinkKind::ConsoleSummary => {
                self.render_summary();
                Ok(())
            }
            SinkKind::Plot { directory } => self.render_plot(directory),
        }
    }

    fn render_summary(&self) {
        for projection in &self.projections {
            let mut line = format!("{} ({} points)", projection.name(), projection.rows.len());
            for (i, coord) in projection.spec.coords.iter().enumerate() {
                if let Some(mean) = projection.mean(i) {
                    let _ = write!(line, " {coord}={mean:.4}");
                }
            }
            log::info!("{line}");
        }
    }

    fn render_plot(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory).map_err(|source| Error::Io {
            path: directory.display().to_string(),
            source,
        })?;

        for projection in &self.projections {
            let mut table = String::from("#");
            for coord in &projection.spec.coords {
                let _ = write!(table, " {coord}");
            }
            if self.colored {
                table.push_str(" group");
            }
            table.push('\n');

            for row in &projection.rows {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                table.push_str(&cells.join("\t"));
                table.push('\n');
            }

            let path = directory.join(format!("{}.dat", projection.name().replace('/', "_")));
            std::fs::write(&path, table).map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
