//! Pangene graph: gene vertices and strand-aware adjacency arcs
use log::{debug, info};
use rayon::prelude::*;

use crate::classify::HitClassifier;
use crate::error::{PangeneError, Result};
use crate::grouping::{reduce_by_key, round_avg};
use crate::hit::{Genome, HitOrder, PangeneData, Protein};
use crate::options::PangeneOpts;

/// A gene admitted into the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub gene_id: u32,
    pub pri: u32, // genomes where the gene's best hit is not shadowed
    pub sec: u32, // genomes where it is only seen shadowed
}

/// Oriented vertex: `rev` is set when the gene is read on the reverse strand
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexEnd {
    pub vertex: u32,
    pub rev: bool,
}

impl VertexEnd {
    pub fn new(vertex: u32, rev: bool) -> Self {
        VertexEnd { vertex, rev }
    }

    pub fn flip(self) -> Self {
        VertexEnd {
            vertex: self.vertex,
            rev: !self.rev,
        }
    }
}

/// Arc key; ordering is by source then destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArcKey {
    pub src: VertexEnd,
    pub dst: VertexEnd,
}

impl ArcKey {
    pub fn new(src: VertexEnd, dst: VertexEnd) -> Self {
        ArcKey { src, dst }
    }

    /// The same adjacency read on the opposite strand
    pub fn reverse(self) -> Self {
        ArcKey {
            src: self.dst.flip(),
            dst: self.src.flip(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub key: ArcKey,
    pub n_genome: u64,  // genomes supporting the adjacency
    pub total_cnt: u64, // observations summed over genomes
    pub avg_dist: i64,
}

/// Adjacency collapsed within one genome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomeArc {
    pub key: ArcKey,
    pub cnt: u64,
    pub avg_dist: i64,
}

#[derive(Debug, Default)]
pub struct PangeneGraph {
    pub vertices: Vec<Vertex>,
    pub arcs: Vec<Arc>,
    g2v: Vec<Option<u32>>,
    n_genome: usize,
    hits_flagged: bool,
}

/// Count, for one genome, which genes have a non-shadowed (pri) or only
/// shadowed (sec) best hit
fn count_presence(proteins: &[Protein], genome: &Genome, n_gene: usize, cnt: &mut [(u32, u32)]) {
    let mut flag = vec![0u8; n_gene];
    for h in genome.hits.iter().filter(|h| h.rank == 0) {
        let gene_id = proteins[h.protein_id as usize].gene_id as usize;
        flag[gene_id] |= if h.shadow { 2 } else { 1 };
    }
    for (c, f) in cnt.iter_mut().zip(flag) {
        if f & 1 != 0 {
            c.0 += 1;
        } else if f & 2 != 0 {
            c.1 += 1;
        }
    }
}

/// Raw adjacencies of one genome, walked in anchor order.
///
/// Leaves the hits sorted by start position.
fn collect_adjacencies(
    proteins: &[Protein],
    g2v: &[Option<u32>],
    genome: &mut Genome,
    genome_idx: usize,
    classifier: &dyn HitClassifier,
) -> Result<Vec<(ArcKey, i64)>> {
    genome.sort_hits(HitOrder::Start);
    let n_shadow = classifier.flag_shadow(proteins, genome, genome_idx, true, true)?;
    debug!("genome {genome_idx}: {n_shadow} shadowed primary hits");

    genome.sort_hits(HitOrder::Anchor);
    let mut raw = Vec::new();
    let mut prev: Option<(VertexEnd, i64, u32)> = None; // (vertex, cm, contig)
    for h in &genome.hits {
        if !h.primary || h.shadow || !h.vtx {
            continue;
        }
        let Some(vid) = g2v[proteins[h.protein_id as usize].gene_id as usize] else {
            continue;
        };
        let w = VertexEnd::new(vid, h.rev);
        if let Some((v, pos, contig_id)) = prev {
            if contig_id == h.contig_id {
                let dist = h.cm - pos;
                raw.push((ArcKey::new(v, w), dist));
                raw.push((ArcKey::new(w.flip(), v.flip()), dist));
            }
        }
        prev = Some((w, h.cm, h.contig_id));
    }
    genome.sort_hits(HitOrder::Start);
    Ok(raw)
}

/// Merge a genome's raw adjacencies sharing a key
pub fn collapse_genome_arcs(raw: &mut [(ArcKey, i64)]) -> Vec<GenomeArc> {
    reduce_by_key(raw, |key, run| {
        let sum: i64 = run.iter().map(|r| r.1).sum();
        GenomeArc {
            key,
            cnt: run.len() as u64,
            avg_dist: round_avg(sum as f64, run.len() as u64),
        }
    })
}

/// Merge per-genome arcs into the final arc set
pub fn merge_genome_arcs(per_genome: Vec<GenomeArc>) -> Vec<Arc> {
    let mut records: Vec<(ArcKey, GenomeArc)> = per_genome.into_iter().map(|a| (a.key, a)).collect();
    reduce_by_key(&mut records, |key, run| {
        let mut tot = 0u64;
        let mut dist = 0i64;
        for (_, a) in run {
            tot += a.cnt;
            dist += a.avg_dist * a.cnt as i64;
        }
        Arc {
            key,
            n_genome: run.len() as u64,
            total_cnt: tot,
            avg_dist: round_avg(dist as f64, tot.max(1)),
        }
    })
}

impl PangeneGraph {
    /// Admit genes whose unshadowed best hit is present in at least
    /// `min_vertex_ratio` of the genomes
    pub fn select_vertices(data: &PangeneData, min_vertex_ratio: f64) -> Self {
        let n_gene = data.n_gene();
        let mut cnt = vec![(0u32, 0u32); n_gene];
        for genome in &data.genomes {
            count_presence(&data.proteins, genome, n_gene, &mut cnt);
        }

        let n_genome = data.genomes.len();
        let min_pri = n_genome as f64 * min_vertex_ratio;
        let mut vertices = Vec::new();
        let mut g2v = vec![None; n_gene];
        for (gene_id, &(pri, sec)) in cnt.iter().enumerate() {
            if pri as f64 >= min_pri {
                g2v[gene_id] = Some(vertices.len() as u32);
                vertices.push(Vertex {
                    gene_id: gene_id as u32,
                    pri,
                    sec,
                });
            }
        }
        info!("selected {} vertices out of {} genes", vertices.len(), n_gene);

        PangeneGraph {
            vertices,
            arcs: Vec::new(),
            g2v,
            n_genome,
            hits_flagged: false,
        }
    }

    /// Vertex index of a gene, if the gene was admitted
    pub fn vertex_of(&self, gene_id: u32) -> Option<u32> {
        self.g2v.get(gene_id as usize).copied().flatten()
    }

    fn check_store(&self, data: &PangeneData) -> Result<()> {
        if data.genomes.len() != self.n_genome || data.n_gene() != self.g2v.len() {
            return Err(PangeneError::GraphState(format!(
                "graph built from {} genomes and {} genes, store has {} and {}",
                self.n_genome,
                self.g2v.len(),
                data.genomes.len(),
                data.n_gene()
            )));
        }
        Ok(())
    }

    /// Mark every hit whose gene is a vertex
    pub fn flag_vertex_hits(&mut self, data: &mut PangeneData) -> Result<()> {
        self.check_store(data)?;
        let proteins = &data.proteins;
        for genome in data.genomes.iter_mut() {
            for h in genome.hits.iter_mut() {
                h.vtx = self.g2v[proteins[h.protein_id as usize].gene_id as usize].is_some();
            }
        }
        self.hits_flagged = true;
        Ok(())
    }

    /// Extract adjacencies per genome and aggregate them across genomes
    pub fn generate_arcs(&mut self, data: &mut PangeneData, classifier: &dyn HitClassifier) -> Result<()> {
        self.check_store(data)?;
        if !self.hits_flagged {
            return Err(PangeneError::GraphState(
                "vertex hits must be flagged before generating arcs".to_string(),
            ));
        }

        let proteins = &data.proteins;
        let g2v = &self.g2v;
        let per_genome = data
            .genomes
            .par_iter_mut()
            .enumerate()
            .map(|(i, genome)| {
                let mut raw = collect_adjacencies(proteins, g2v, genome, i, classifier)?;
                Ok(collapse_genome_arcs(&mut raw))
            })
            .collect::<Result<Vec<_>>>()?;

        let n_local: usize = per_genome.iter().map(|a| a.len()).sum();
        self.arcs = merge_genome_arcs(per_genome.into_iter().flatten().collect());
        info!("generated {} arcs from {} per-genome arcs", self.arcs.len(), n_local);
        Ok(())
    }

    /// Run vertex selection, hit flagging and arc generation in order
    pub fn build(data: &mut PangeneData, opts: &PangeneOpts, classifier: &dyn HitClassifier) -> Result<Self> {
        opts.validate()?;
        let mut graph = Self::select_vertices(data, opts.min_vertex_ratio);
        graph.flag_vertex_hits(data)?;
        graph.generate_arcs(data, classifier)?;
        Ok(graph)
    }

    pub fn find_arc(&self, key: ArcKey) -> Option<&Arc> {
        self.arcs
            .binary_search_by(|a| a.key.cmp(&key))
            .ok()
            .map(|i| &self.arcs[i])
    }
}
