use crate::{options::Options, paths::Paths, plot, progress};
use anyhow::{Context, Result};
use log::{info, warn};
use profiles::{
    calculate_slope,
    colour::hex_palette,
    fcluster, linkage,
    profile::{
        assign_clusters, profiles_by_stream_order, remove_non_unique_profiles,
        remove_profiles_shorter_than, write_clustered_csv, write_profiles_csv,
    },
    Clusters, DistanceMatrix, Linkage, Metric, PointTable, RiverProfile, Threshold,
};
use serde::Serialize;
use std::{fs, path::Path};

/// Effective configuration and outcome of a clustering run.
#[derive(Debug, Serialize)]
struct Report<'a> {
    dir: &'a Path,
    fname: &'a str,
    out_dir: &'a Path,
    len: usize,
    slope_window: usize,
    method: String,
    step: f64,
    stream_order: u32,
    metric: String,
    threshold: String,
    cut: f64,
    n_profiles: usize,
    n_clusters: usize,
}

/// Tree and cut of one clustering run, with the colour of each
/// cluster.
struct Clustering {
    tree: Linkage,
    clusters: Clusters,
    palette: Vec<String>,
}

impl Options {
    /// Clusters, then plots, loading the channel network once.
    pub fn run(&self) -> Result<()> {
        let paths = self.paths();
        let table = self.load_points(&paths)?;
        self.cluster_points(&paths, &table)?;
        self.plot_points(&paths, &table)
    }

    /// Extracts, filters and clusters profiles, writing the tables and
    /// dendrogram. Returns the cut made.
    pub fn cluster(&self) -> Result<Clusters> {
        let paths = self.paths();
        let table = self.load_points(&paths)?;
        self.cluster_points(&paths, &table)
    }

    fn cluster_points(&self, paths: &Paths, table: &PointTable) -> Result<Clusters> {
        let Clustering {
            tree,
            clusters,
            palette,
        } = self.tabulate(paths, table)?;
        plot::dendrogram(&paths.dendrogram(), &tree, &clusters, &palette)?;
        Ok(clusters)
    }

    /// Writes the profile, linkage, clustered profile and report tables.
    fn tabulate(&self, paths: &Paths, table: &PointTable) -> Result<Clustering> {
        fs::create_dir_all(paths.out_dir())
            .with_context(|| format!("creating {}", paths.out_dir().display()))?;

        let threshold = self.threshold();
        if matches!(threshold, Threshold::MinCorrelation(_)) && self.metric != Metric::Correlation
        {
            warn!(
                "--min-corr assumes correlation distances, but the metric is {}",
                self.metric
            );
        }

        let profiles = self.select_profiles(table)?;
        write_profiles_csv(paths.profiles(), &profiles)?;

        let slopes: Vec<Vec<f64>> = profiles.iter().map(RiverProfile::slopes).collect();
        let pb = progress::bar("distance matrix".to_string(), slopes.len() as u64);
        let matrix = DistanceMatrix::pairwise_with_progress(&slopes, self.metric, || pb.inc(1));
        pb.finish_and_clear();

        let tree = linkage(&matrix, self.method)?;
        tree.write_csv(paths.linkage())?;
        let clusters = fcluster(&tree, threshold)?;

        let palette = hex_palette(clusters.n_clusters());
        let clustered = assign_clusters(&profiles, &clusters.labels, &palette)?;
        write_clustered_csv(paths.clustered(), &clustered)?;

        self.write_report(paths, threshold, &clusters)?;
        info!(
            "{} profiles in {} clusters written to {}",
            profiles.len(),
            clusters.n_clusters(),
            paths.clustered().display()
        );
        Ok(Clustering {
            tree,
            clusters,
            palette,
        })
    }

    /// Reads the channel network with slopes, from the cache for this
    /// slope window when there is one.
    pub fn load_points(&self, paths: &Paths) -> Result<PointTable> {
        let cache = paths.slopes();
        if cache.exists() && !self.overwrite {
            info!("reading slopes from {}", cache.display());
            return PointTable::from_path(&cache)
                .with_context(|| format!("reading {}", cache.display()));
        }

        let tribs = paths.tribs();
        let mut table = PointTable::from_path(&tribs)
            .with_context(|| format!("reading {}", tribs.display()))?;
        calculate_slope(&mut table, self.slope_window)?;
        fs::create_dir_all(paths.out_dir())?;
        table
            .write_csv(&cache)
            .with_context(|| format!("writing {}", cache.display()))?;
        Ok(table)
    }

    fn select_profiles(&self, table: &PointTable) -> Result<Vec<RiverProfile>> {
        let mut profiles = profiles_by_stream_order(table, self.step, self.stream_order)?;
        if self.stream_order > 1 {
            profiles = remove_non_unique_profiles(profiles);
        }
        Ok(remove_profiles_shorter_than(profiles, self.len))
    }

    fn write_report(
        &self,
        paths: &Paths,
        threshold: Threshold,
        clusters: &Clusters,
    ) -> Result<()> {
        let threshold = match threshold {
            Threshold::Distance(t) => format!("distance {t}"),
            Threshold::MinCorrelation(c) => format!("min correlation {c}"),
            Threshold::MaxClusters(k) => format!("max clusters {k}"),
            Threshold::Auto => "auto".to_string(),
        };
        let out_dir = paths.out_dir();
        let report = Report {
            dir: &self.dir,
            fname: &self.fname,
            out_dir,
            len: self.len,
            slope_window: self.slope_window,
            method: self.method.to_string(),
            step: self.step,
            stream_order: self.stream_order,
            metric: self.metric.to_string(),
            threshold,
            cut: clusters.threshold,
            n_profiles: clusters.labels.len(),
            n_clusters: clusters.n_clusters(),
        };
        let mut wtr = csv::Writer::from_path(paths.report())?;
        wtr.serialize(&report)?;
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::options::{Cli, Options};
    use approx::assert_relative_eq;
    use clap::Parser;
    use profiles::{profile::read_clustered_csv, PointTable};
    use std::{fs, path::Path};
    use tempfile::tempdir;

    /// Four sources, each with six first order nodes of its own draining
    /// into the same six second order nodes. Elevations are multiplied
    /// by `relief`.
    fn tribs(relief: f64) -> String {
        let mut csv = String::from(
            "id,node,row,col,latitude,longitude,distance_from_outlet,elevation,drainage_area,stream_order\n",
        );
        for id in 1..=4_u32 {
            for i in 0..6_u32 {
                let dist = 110.0 - 10.0 * f64::from(i);
                let wiggle = f64::from((i * id) % 3);
                let elev = relief * (50.0 + dist * 0.02 * f64::from(id) + wiggle);
                let node = 10 * id + i;
                csv.push_str(&format!(
                    "{id},{node},{i},{id},34.1,-117.2,{dist},{elev},100,1\n"
                ));
            }
            for i in 0..6_u32 {
                let dist = 50.0 - 10.0 * f64::from(i);
                let elev = relief * (10.0 + dist * 0.1 + f64::from(i % 2) * 0.5);
                let (node, row) = (100 + i, 6 + i);
                csv.push_str(&format!(
                    "{id},{node},{row},0,34.1,-117.2,{dist},{elev},1000,2\n"
                ));
            }
        }
        csv
    }

    fn options(dir: &Path, slope_window: usize, extra: &[&str]) -> Options {
        let dir = dir.to_str().unwrap();
        let window = slope_window.to_string();
        let mut args = vec![
            "riverclust",
            "-d",
            dir,
            "-f",
            "basin",
            "-w",
            window.as_str(),
            "--step",
            "10",
            "--len",
            "3",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap().options
    }

    fn slopes(table: &PointTable) -> Vec<Option<f64>> {
        table.points().map(|p| p.slope).collect()
    }

    #[test]
    fn test_shared_trunk_is_clustered_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("basin_all_tribs.csv"), tribs(1.0)).unwrap();

        let first_order = options(dir.path(), 3, &[]);
        let table = first_order.load_points(&first_order.paths()).unwrap();
        let ids: Vec<u32> = first_order
            .select_profiles(&table)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let second_order = options(dir.path(), 3, &["-s", "2"]);
        let profiles = second_order.select_profiles(&table).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, 1);
        assert_eq!(profiles[0].len(), 5);
    }

    #[test]
    fn test_cluster_writes_tables() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("basin_all_tribs.csv"), tribs(1.0)).unwrap();
        let options = options(dir.path(), 3, &["-k", "2"]);
        let paths = options.paths();
        let table = options.load_points(&paths).unwrap();
        let clustering = options.tabulate(&paths, &table).unwrap();

        assert_eq!(clustering.tree.len(), 4);
        assert_eq!(clustering.clusters.labels.len(), 4);
        assert!(clustering.clusters.n_clusters() <= 2);
        assert_eq!(clustering.palette.len(), clustering.clusters.n_clusters());
        for name in [
            "basin_report.csv",
            "basin_slopes_W3.csv",
            "basin_profiles_SO1.csv",
            "basin_linkage_SO1.csv",
            "basin_profiles_clustered_SO1.csv",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        let clustered = read_clustered_csv(paths.clustered()).unwrap();
        let labels: Vec<u32> = clustered.iter().map(|p| p.cluster_id).collect();
        assert_eq!(labels, clustering.clusters.labels);
        assert!(clustered.iter().all(|p| p.nodes.len() == 5));

        let mut rdr = csv::Reader::from_path(paths.report()).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let record = rdr.records().next().unwrap().unwrap();
        let field = |name: &str| {
            let idx = headers.iter().position(|h| h == name).unwrap();
            record[idx].to_string()
        };
        assert_eq!(field("slope_window"), "3");
        assert_eq!(field("method"), "ward");
        assert_eq!(field("threshold"), "max clusters 2");
        assert_eq!(field("n_profiles"), "4");
    }

    #[test]
    fn test_slope_cache_per_window() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("basin_all_tribs.csv");
        fs::write(&input, tribs(1.0)).unwrap();

        let w3 = options(dir.path(), 3, &[]);
        let first = w3.load_points(&w3.paths()).unwrap();
        assert!(dir.path().join("basin_slopes_W3.csv").exists());
        assert!(first.sources()[0].points[1].slope.is_some());

        // The cache stands in for the input.
        fs::remove_file(&input).unwrap();
        let cached = w3.load_points(&w3.paths()).unwrap();
        assert_eq!(slopes(&cached), slopes(&first));

        // Another window never reads the window 3 slopes.
        let w5 = options(dir.path(), 5, &[]);
        assert!(w5.load_points(&w5.paths()).is_err());
        fs::write(&input, tribs(1.0)).unwrap();
        let table = w5.load_points(&w5.paths()).unwrap();
        assert!(dir.path().join("basin_slopes_W5.csv").exists());
        assert!(table.sources()[0].points[1].slope.is_none());
        assert!(table.sources()[0].points[2].slope.is_some());
    }

    #[test]
    fn test_overwrite_recomputes_slopes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("basin_all_tribs.csv");
        fs::write(&input, tribs(1.0)).unwrap();
        let w3 = options(dir.path(), 3, &[]);
        let first = w3.load_points(&w3.paths()).unwrap();

        fs::write(&input, tribs(2.0)).unwrap();
        let cached = w3.load_points(&w3.paths()).unwrap();
        assert_eq!(slopes(&cached), slopes(&first));

        let overwrite = options(dir.path(), 3, &["-O"]);
        let steeper = overwrite.load_points(&overwrite.paths()).unwrap();
        for (before, after) in slopes(&first).into_iter().zip(slopes(&steeper)) {
            match (before, after) {
                (Some(before), Some(after)) => {
                    assert_relative_eq!(after, 2.0 * before, epsilon = 1e-9);
                }
                (before, after) => assert_eq!(before, after),
            }
        }

        // The rewritten cache is what later runs read.
        let reread = w3.load_points(&w3.paths()).unwrap();
        assert_eq!(slopes(&reread), slopes(&steeper));
    }
}
