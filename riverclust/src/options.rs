use crate::paths::Paths;
use clap::{Args, Parser, Subcommand};
use profiles::{Method, Metric, Threshold};
use std::path::PathBuf;

/// Cluster river longitudinal profiles by the shape of their gradient.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: Options,

    /// What to do, `run` when omitted.
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Clone, Args)]
pub struct Options {
    /// Directory holding `<fname>_all_tribs.csv` and the DEM.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Prefix of the DEM and channel network files, without extension.
    #[arg(short, long)]
    pub fname: String,

    /// Output directory [default: --dir].
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Minimum number of regular samples for a profile to be
    /// clustered.
    #[arg(long, default_value_t = 5)]
    pub len: usize,

    /// Number of nodes in the moving slope regression, odd.
    #[arg(short = 'w', long, default_value_t = 25)]
    pub slope_window: usize,

    /// Linkage method: single, complete, average, weighted, centroid,
    /// median or ward.
    #[arg(short, long, default_value_t = Method::Ward)]
    pub method: Method,

    /// Regular profile spacing in meters. Should exceed the diagonal
    /// of a DEM cell.
    #[arg(long, default_value_t = 2.0)]
    pub step: f64,

    /// Stream order to cluster.
    #[arg(short, long, default_value_t = 1)]
    pub stream_order: u32,

    /// Profile dissimilarity: correlation or rmse.
    #[arg(long, default_value_t = Metric::Correlation)]
    pub metric: Metric,

    /// Cut the dendrogram at this merge distance.
    #[arg(short, long, conflicts_with_all = ["min_corr", "n_clusters"])]
    pub threshold: Option<f64>,

    /// Cut at the minimum correlation within a cluster (0 to 1).
    #[arg(short = 'c', long, conflicts_with = "n_clusters")]
    pub min_corr: Option<f64>,

    /// Cut into at most this many clusters.
    #[arg(short = 'k', long)]
    pub n_clusters: Option<usize>,

    /// Categorical lithology raster (ENVI .bil) for the lithology map.
    #[arg(long)]
    pub lithology: Option<PathBuf>,

    /// Recompute slopes even if `<fname>_slopes_W<slope-window>.csv`
    /// exists.
    #[arg(short = 'O', long)]
    pub overwrite: bool,
}

impl Options {
    /// Dendrogram cut requested on the command line, the largest gap
    /// when none is given.
    pub fn threshold(&self) -> Threshold {
        match (self.threshold, self.min_corr, self.n_clusters) {
            (Some(t), _, _) => Threshold::Distance(t),
            (_, Some(c), _) => Threshold::MinCorrelation(c),
            (_, _, Some(k)) => Threshold::MaxClusters(k),
            _ => Threshold::Auto,
        }
    }

    pub fn paths(&self) -> Paths {
        Paths::new(
            self.dir.clone(),
            self.out_dir.clone().unwrap_or_else(|| self.dir.clone()),
            self.fname.clone(),
            self.stream_order,
            self.slope_window,
        )
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Cluster, then plot.
    Run,

    /// Extract, filter and cluster profiles.
    Cluster,

    /// Make figures from previously clustered profiles.
    Plot,

    /// Print cluster statistics.
    Summary {
        /// Print JSON instead of a table and chart.
        #[arg(long)]
        json: bool,
    },
}
