//! Shared fixtures for integration tests
#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use pangene::classify::{post_process, OverlapClassifier};
use pangene::graph::PangeneGraph;
use pangene::hit::PangeneData;
use pangene::options::PangeneOpts;
use pangene::paf::read_paf;

/// One ungapped protein hit: `n_aa` residues starting at `cs`
pub struct TestHit<'a> {
    pub query: &'a str,
    pub contig: &'a str,
    pub cs: i64,
    pub n_aa: i64,
    pub rev: bool,
    pub score: i32,
}

impl<'a> TestHit<'a> {
    pub fn new(query: &'a str, contig: &'a str, cs: i64) -> Self {
        TestHit {
            query,
            contig,
            cs,
            n_aa: 100,
            rev: false,
            score: 100,
        }
    }

    pub fn rev(mut self) -> Self {
        self.rev = true;
        self
    }

    pub fn score(mut self, score: i32) -> Self {
        self.score = score;
        self
    }

    pub fn ce(&self) -> i64 {
        self.cs + self.n_aa * 3
    }

    pub fn anchor(&self) -> i64 {
        self.cs + (self.ce() - self.cs) / 2
    }

    pub fn paf_line(&self) -> String {
        let strand = if self.rev { '-' } else { '+' };
        format!(
            "{}\t{}\t0\t{}\t{}\t{}\t10000000\t{}\t{}\t{}\t{}\t0\tAS:i:{}\tms:i:{}\tcg:Z:{}M",
            self.query,
            self.n_aa,
            self.n_aa,
            strand,
            self.contig,
            self.cs,
            self.ce(),
            self.n_aa,
            self.n_aa,
            self.score,
            self.score,
            self.n_aa
        )
    }
}

/// Write a PAF file for one genome
pub fn write_genome(dir: &Path, name: &str, hits: &[TestHit]) -> PathBuf {
    let path = dir.join(format!("{name}.paf"));
    let content: String = hits.iter().map(|h| h.paf_line() + "\n").collect();
    fs::write(&path, content).expect("Failed to write PAF file");
    path
}

/// Read genomes, classify and build the graph with default options
pub fn build_from_files(paths: &[PathBuf], opts: &PangeneOpts) -> (PangeneData, PangeneGraph) {
    let mut data = PangeneData::new();
    for path in paths {
        read_paf(&mut data, path.to_str().unwrap(), opts.gene_sep).unwrap();
    }
    let classifier = OverlapClassifier::new(opts.max_shadow_overlap);
    post_process(&mut data, &classifier).unwrap();
    let graph = PangeneGraph::build(&mut data, opts, &classifier).unwrap();
    (data, graph)
}

/// Vertex index of a gene by name
pub fn vertex(data: &PangeneData, graph: &PangeneGraph, gene: &str) -> u32 {
    let gene_id = data.genes.get(gene).expect("unknown gene");
    graph.vertex_of(gene_id).expect("gene is not a vertex")
}
