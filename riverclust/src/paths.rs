//! Input and output file names, all derived from the DEM prefix.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Paths {
    dir: PathBuf,
    out_dir: PathBuf,
    fname: String,
    stream_order: u32,
    slope_window: usize,
}

impl Paths {
    pub fn new(
        dir: PathBuf,
        out_dir: PathBuf,
        fname: String,
        stream_order: u32,
        slope_window: usize,
    ) -> Self {
        Self {
            dir,
            out_dir,
            fname,
            stream_order,
            slope_window,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn input(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", self.fname))
    }

    fn output(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}{suffix}", self.fname))
    }

    fn output_so(&self, suffix: &str, ext: &str) -> PathBuf {
        self.output(&format!("{suffix}_SO{}.{ext}", self.stream_order))
    }

    /// Channel network export.
    pub fn tribs(&self) -> PathBuf {
        self.input("_all_tribs.csv")
    }

    pub fn dem(&self) -> PathBuf {
        self.input(".bil")
    }

    pub fn hillshade(&self) -> PathBuf {
        self.input("_hs.bil")
    }

    /// Channel network with slopes, reused by later runs with the same
    /// slope window.
    pub fn slopes(&self) -> PathBuf {
        self.output(&format!("_slopes_W{}.csv", self.slope_window))
    }

    pub fn report(&self) -> PathBuf {
        self.output("_report.csv")
    }

    pub fn profiles(&self) -> PathBuf {
        self.output_so("_profiles", "csv")
    }

    pub fn clustered(&self) -> PathBuf {
        self.output_so("_profiles_clustered", "csv")
    }

    pub fn linkage(&self) -> PathBuf {
        self.output_so("_linkage", "csv")
    }

    pub fn dendrogram(&self) -> PathBuf {
        self.output_so("_dendrogram", "png")
    }

    pub fn cluster_profiles(&self, cluster_id: u32) -> PathBuf {
        self.output(&format!(
            "_profiles_SO{}_CL{cluster_id}.png",
            self.stream_order
        ))
    }

    pub fn median_profiles(&self) -> PathBuf {
        self.output_so("_profiles_median", "png")
    }

    pub fn slope_area(&self) -> PathBuf {
        self.output_so("_SA_median", "png")
    }

    pub fn boxplot(&self) -> PathBuf {
        self.output_so("_boxplot", "png")
    }

    pub fn trunk(&self) -> PathBuf {
        self.output("_trunk_profile.png")
    }

    pub fn hillshade_map(&self) -> PathBuf {
        self.output_so("_hs_clusters", "png")
    }

    pub fn lithology_map(&self) -> PathBuf {
        self.output_so("_lith_clusters", "png")
    }

    pub fn lithology_table(&self) -> PathBuf {
        self.output_so("_lithology", "csv")
    }
}

#[cfg(test)]
mod tests {
    use super::Paths;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_names() {
        let paths = Paths::new(
            PathBuf::from("data"),
            PathBuf::from("out"),
            "indian_creek".to_string(),
            2,
            25,
        );
        assert_eq!(paths.tribs(), Path::new("data/indian_creek_all_tribs.csv"));
        assert_eq!(paths.hillshade(), Path::new("data/indian_creek_hs.bil"));
        assert_eq!(paths.slopes(), Path::new("out/indian_creek_slopes_W25.csv"));
        assert_eq!(
            paths.linkage(),
            Path::new("out/indian_creek_linkage_SO2.csv")
        );
        assert_eq!(
            paths.cluster_profiles(3),
            Path::new("out/indian_creek_profiles_SO2_CL3.png")
        );
        assert_eq!(
            paths.slope_area(),
            Path::new("out/indian_creek_SA_median_SO2.png")
        );
        assert_eq!(paths.trunk(), Path::new("out/indian_creek_trunk_profile.png"));
    }
}
