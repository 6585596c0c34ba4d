use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("no river points in input")]
    EmptyTable,

    #[error("slope window must be an odd number of at least 3 nodes, got {0}")]
    SlopeWindow(usize),

    #[error("profile step must be positive, got {0}")]
    Step(f64),

    #[error("clustering needs at least 2 profiles, got {0}")]
    TooFewProfiles(usize),

    #[error("condensed distance matrix has {actual} entries, expected {expected}")]
    Condensed { expected: usize, actual: usize },

    #[error("unknown linkage method '{0}'")]
    Method(String),

    #[error("unknown distance metric '{0}'")]
    Metric(String),

    #[error("invalid threshold: {0}")]
    Threshold(String),

    #[error("{0} labels given for {1} profiles")]
    Labels(usize, usize),

    #[error("no colour for cluster {cluster_id} in a palette of {colours}")]
    Palette { cluster_id: u32, colours: usize },
}
