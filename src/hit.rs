use log::info;

use crate::seq_registry::NameDict;

/// One exon of a hit, relative to the start of the hit's alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exon {
    pub start: i64,
    pub end: i64,
    pub frameshifts: u32, // frameshifts since the previous intron
}

impl Exon {
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Protein (alignment query); several proteins may share one gene
#[derive(Debug, Clone)]
pub struct Protein {
    pub name: String,
    pub len: u32,
    pub gene_id: u32,
}

#[derive(Debug, Clone)]
pub struct Contig {
    pub name: String,
    pub len: u64,
}

/// Alignment of one protein to a contig region
#[derive(Debug, Clone, Default)]
pub struct Hit {
    pub protein_id: u32,
    pub contig_id: u32,
    pub qs: u32,
    pub qe: u32,
    pub cs: i64,
    pub ce: i64,
    pub cm: i64, // anchor position for adjacency ordering
    pub rev: bool,
    pub mlen: u32,
    pub blen: u32,
    pub score: i32,
    pub exon_off: usize,
    pub n_exon: u32,
    pub frameshifts: u32,

    // Classification flags
    pub rank: u32,
    pub primary: bool,
    pub shadow: bool,
    pub pseudo: bool,
    pub vtx: bool,
}

impl Hit {
    pub fn span(&self) -> i64 {
        self.ce - self.cs
    }

    /// Midpoint of the genomic span
    pub fn anchor(cs: i64, ce: i64) -> i64 {
        cs + (ce - cs) / 2
    }
}

/// Orderings a genome's hits can be put in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOrder {
    Start,  // (contig, cs)
    Anchor, // (contig, cm)
}

/// All hits of one genome
#[derive(Debug, Default)]
pub struct Genome {
    pub label: String,
    pub contigs: Vec<Contig>,
    pub hits: Vec<Hit>,
    pub exons: Vec<Exon>,
    contig_dict: NameDict,
}

impl Genome {
    pub fn new(label: &str) -> Self {
        Genome {
            label: label.to_string(),
            ..Default::default()
        }
    }

    /// Get or create a contig; the length is updated on every call
    pub fn add_contig(&mut self, name: &str, len: u64) -> u32 {
        let (id, absent) = self.contig_dict.put(name);
        if absent {
            self.contigs.push(Contig {
                name: name.to_string(),
                len,
            });
        } else {
            self.contigs[id as usize].len = len;
        }
        id
    }

    /// Append a hit together with its exons; sets the hit's exon range
    pub fn push_hit(&mut self, mut hit: Hit, exons: &[Exon]) {
        hit.exon_off = self.exons.len();
        hit.n_exon = exons.len() as u32;
        hit.frameshifts = exons.iter().map(|e| e.frameshifts).sum();
        self.exons.extend_from_slice(exons);
        self.hits.push(hit);
    }

    pub fn exons_of(&self, hit: &Hit) -> &[Exon] {
        &self.exons[hit.exon_off..hit.exon_off + hit.n_exon as usize]
    }

    pub fn sort_hits(&mut self, order: HitOrder) {
        match order {
            HitOrder::Start => self
                .hits
                .sort_by_key(|h| (h.contig_id, h.cs, h.ce, h.protein_id)),
            HitOrder::Anchor => self
                .hits
                .sort_by_key(|h| (h.contig_id, h.cm, h.cs, h.protein_id)),
        }
    }

    pub fn is_sorted_by_start(&self) -> bool {
        self.hits
            .windows(2)
            .all(|w| (w[0].contig_id, w[0].cs) <= (w[1].contig_id, w[1].cs))
    }
}

/// Multi-genome store shared by the reader, the classifiers and the graph
#[derive(Debug, Default)]
pub struct PangeneData {
    pub genes: NameDict,
    pub proteins: Vec<Protein>,
    pub genomes: Vec<Genome>,
    prot_dict: NameDict,
}

impl PangeneData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_gene(&self) -> usize {
        self.genes.len()
    }

    /// Intern a query name and its gene, returning the protein ID.
    ///
    /// The gene of a protein is fixed the first time the protein is seen;
    /// the length is overwritten on every call.
    pub fn add_protein(&mut self, query_name: &str, len: u32, gene_sep: char) -> u32 {
        let gene_name = query_name
            .split_once(gene_sep)
            .map_or(query_name, |(gene, _)| gene);
        let (gene_id, _) = self.genes.put(gene_name);
        let (pid, absent) = self.prot_dict.put(query_name);
        if absent {
            self.proteins.push(Protein {
                name: query_name.to_string(),
                len,
                gene_id,
            });
        } else {
            self.proteins[pid as usize].len = len;
        }
        pid
    }

    pub fn gene_of(&self, hit: &Hit) -> u32 {
        self.proteins[hit.protein_id as usize].gene_id
    }

    pub fn gene_name(&self, gene_id: u32) -> &str {
        self.genes.name(gene_id).unwrap_or("*")
    }

    pub fn log_summary(&self) {
        info!(
            "{} genomes, {} genes and {} proteins",
            self.genomes.len(),
            self.n_gene(),
            self.proteins.len()
        );
    }
}
