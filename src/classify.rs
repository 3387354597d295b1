//! Per-genome hit classification: ranking, pseudogenes and shadowed hits
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;

use crate::error::{PangeneError, Result};
use crate::hit::{Genome, Hit, HitOrder, PangeneData, Protein};

/// Classification passes consumed by the graph builder
pub trait HitClassifier: Sync {
    /// Assign per-protein ranks and flag one primary hit per gene
    fn flag_primary(&self, proteins: &[Protein], genome: &mut Genome);

    /// Flag pseudogene-like hits; returns the number flagged
    fn flag_pseudo(&self, genome: &mut Genome) -> usize;

    /// Recompute shadow flags; returns the number flagged.
    ///
    /// With `require_position_order` the hits must already be sorted by
    /// start. With `use_consensus_geometry` only primary hits take part.
    fn flag_shadow(
        &self,
        proteins: &[Protein],
        genome: &mut Genome,
        genome_idx: usize,
        require_position_order: bool,
        use_consensus_geometry: bool,
    ) -> Result<usize>;
}

/// Classifier based on score ranking and span overlap between genes
#[derive(Debug, Clone)]
pub struct OverlapClassifier {
    pub max_shadow_overlap: f64,
}

impl OverlapClassifier {
    pub fn new(max_shadow_overlap: f64) -> Self {
        OverlapClassifier { max_shadow_overlap }
    }

    fn overlaps(&self, a: &Hit, b: &Hit) -> bool {
        let ov = a.ce.min(b.ce) - a.cs.max(b.cs);
        if ov <= 0 {
            return false;
        }
        let min_len = a.span().min(b.span()).max(1);
        ov as f64 >= self.max_shadow_overlap * min_len as f64
    }
}

impl HitClassifier for OverlapClassifier {
    fn flag_primary(&self, proteins: &[Protein], genome: &mut Genome) {
        let hits = &mut genome.hits;
        let mut by_protein: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, h) in hits.iter().enumerate() {
            by_protein.entry(h.protein_id).or_default().push(i);
        }

        // Rank by score within each protein
        for idx in by_protein.values_mut() {
            idx.sort_by_key(|&i| {
                let h = &hits[i];
                (std::cmp::Reverse(h.score), h.contig_id, h.cs, h.ce)
            });
            for (rank, &i) in idx.iter().enumerate() {
                hits[i].rank = rank as u32;
                hits[i].primary = false;
            }
        }

        // Best rank-0 hit per gene
        let mut best: HashMap<u32, usize> = HashMap::new();
        for (i, h) in hits.iter().enumerate() {
            if h.rank != 0 {
                continue;
            }
            let gene_id = proteins[h.protein_id as usize].gene_id;
            let key = |h: &Hit| (std::cmp::Reverse(h.score), h.protein_id, h.contig_id, h.cs);
            best.entry(gene_id)
                .and_modify(|b| {
                    if key(h) < key(&hits[*b]) {
                        *b = i;
                    }
                })
                .or_insert(i);
        }
        for i in best.into_values() {
            hits[i].primary = true;
        }
    }

    fn flag_pseudo(&self, genome: &mut Genome) -> usize {
        // Exon count of each protein's best hit
        let mut best_n_exon: HashMap<u32, u32> = HashMap::new();
        for h in genome.hits.iter().filter(|h| h.rank == 0) {
            best_n_exon.insert(h.protein_id, h.n_exon);
        }

        let mut n_pseudo = 0;
        for h in genome.hits.iter_mut() {
            let processed = h.n_exon == 1
                && best_n_exon.get(&h.protein_id).is_some_and(|&n| n > 1);
            h.pseudo = h.frameshifts > 0 || processed;
            if h.pseudo {
                n_pseudo += 1;
            }
        }
        n_pseudo
    }

    fn flag_shadow(
        &self,
        proteins: &[Protein],
        genome: &mut Genome,
        genome_idx: usize,
        require_position_order: bool,
        use_consensus_geometry: bool,
    ) -> Result<usize> {
        if require_position_order && !genome.is_sorted_by_start() {
            return Err(PangeneError::UnsortedHits { genome: genome_idx });
        }
        let hits = &mut genome.hits;
        let order: Vec<usize> = if require_position_order {
            (0..hits.len()).collect()
        } else {
            let mut order: Vec<usize> = (0..hits.len()).collect();
            order.sort_by_key(|&i| (hits[i].contig_id, hits[i].cs));
            order
        };

        for h in hits.iter_mut() {
            h.shadow = false;
        }
        let eligible = |h: &Hit| !use_consensus_geometry || h.primary;

        let mut shadowed = vec![false; hits.len()];
        for (k, &i) in order.iter().enumerate() {
            let a = &hits[i];
            if !eligible(a) {
                continue;
            }
            let gene_a = proteins[a.protein_id as usize].gene_id;
            for &j in &order[k + 1..] {
                let b = &hits[j];
                if b.contig_id != a.contig_id || b.cs >= a.ce {
                    break;
                }
                if !eligible(b) || proteins[b.protein_id as usize].gene_id == gene_a {
                    continue;
                }
                if self.overlaps(a, b) {
                    // The later hit loses ties
                    if b.score > a.score {
                        shadowed[i] = true;
                    } else {
                        shadowed[j] = true;
                    }
                }
            }
        }

        let mut n_shadow = 0;
        for (h, s) in hits.iter_mut().zip(shadowed) {
            h.shadow = s;
            n_shadow += s as usize;
        }
        Ok(n_shadow)
    }
}

/// Rank, flag pseudogenes and flag shadowed hits in every genome.
///
/// Leaves each genome's hits sorted by start position.
pub fn post_process(data: &mut PangeneData, classifier: &dyn HitClassifier) -> Result<()> {
    data.log_summary();
    let proteins = &data.proteins;
    let counts = data
        .genomes
        .par_iter_mut()
        .enumerate()
        .map(|(i, genome)| {
            classifier.flag_primary(proteins, genome);
            let n_pseudo = classifier.flag_pseudo(genome);
            genome.sort_hits(HitOrder::Start);
            let n_shadow = classifier.flag_shadow(proteins, genome, i, true, false)?;
            Ok((n_pseudo, n_shadow))
        })
        .collect::<Result<Vec<_>>>()?;

    for (i, (n_pseudo, n_shadow)) in counts.into_iter().enumerate() {
        debug!("genome {i}: {n_pseudo} pseudo, {n_shadow} shadow");
    }
    info!("classified hits in {} genomes", data.genomes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::Exon;

    fn add_hit(data: &mut PangeneData, g: usize, query: &str, cs: i64, ce: i64, score: i32) {
        let protein_id = data.add_protein(query, 100, ':');
        let genome = &mut data.genomes[g];
        let contig_id = genome.add_contig("chr1", 1_000_000);
        let hit = Hit {
            protein_id,
            contig_id,
            cs,
            ce,
            cm: Hit::anchor(cs, ce),
            score,
            ..Default::default()
        };
        let exon = Exon { start: 0, end: ce - cs, frameshifts: 0 };
        genome.push_hit(hit, &[exon]);
    }

    fn setup() -> PangeneData {
        let mut data = PangeneData::new();
        data.genomes.push(Genome::new("g0"));
        add_hit(&mut data, 0, "A:1", 100, 400, 50);
        add_hit(&mut data, 0, "A:1", 5000, 5300, 30);
        add_hit(&mut data, 0, "A:2", 100, 400, 60);
        add_hit(&mut data, 0, "B", 150, 420, 20);
        add_hit(&mut data, 0, "C", 2000, 2300, 20);
        data
    }

    #[test]
    fn test_ranks_and_primary() {
        let mut data = setup();
        let classifier = OverlapClassifier::new(0.5);
        classifier.flag_primary(&data.proteins, &mut data.genomes[0]);

        let hits = &data.genomes[0].hits;
        let ranks: Vec<u32> = hits.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, vec![0, 1, 0, 0, 0]);
        let primary: Vec<bool> = hits.iter().map(|h| h.primary).collect();
        // A:2 outscores A:1 for gene A
        assert_eq!(primary, vec![false, false, true, true, true]);
    }

    #[test]
    fn test_shadow_by_other_gene() {
        let mut data = setup();
        let classifier = OverlapClassifier::new(0.5);
        classifier.flag_primary(&data.proteins, &mut data.genomes[0]);
        data.genomes[0].sort_hits(HitOrder::Start);

        let n = classifier
            .flag_shadow(&data.proteins, &mut data.genomes[0], 0, true, false)
            .unwrap();
        assert_eq!(n, 1);
        let genome = &data.genomes[0];
        let shadowed: Vec<&str> = genome
            .hits
            .iter()
            .filter(|h| h.shadow)
            .map(|h| data.proteins[h.protein_id as usize].name.as_str())
            .collect();
        assert_eq!(shadowed, vec!["B"]);
    }

    #[test]
    fn test_consensus_ignores_non_primary() {
        let mut data = setup();
        let classifier = OverlapClassifier::new(0.5);
        classifier.flag_primary(&data.proteins, &mut data.genomes[0]);
        // B now only overlaps the non-primary A:1 hit
        data.genomes[0].hits[2].cs = 10_000;
        data.genomes[0].hits[2].ce = 10_300;
        data.genomes[0].sort_hits(HitOrder::Start);

        let n = classifier
            .flag_shadow(&data.proteins, &mut data.genomes[0], 0, true, true)
            .unwrap();
        assert_eq!(n, 0);
        let n = classifier
            .flag_shadow(&data.proteins, &mut data.genomes[0], 0, true, false)
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_shadow_requires_sorted_hits() {
        let mut data = setup();
        data.genomes[0].sort_hits(HitOrder::Start);
        data.genomes[0].hits.reverse();
        let classifier = OverlapClassifier::new(0.5);
        let err = classifier
            .flag_shadow(&data.proteins, &mut data.genomes[0], 3, true, false)
            .unwrap_err();
        assert!(matches!(err, PangeneError::UnsortedHits { genome: 3 }));

        // Unordered mode sorts internally and keeps hit order
        let before: Vec<i64> = data.genomes[0].hits.iter().map(|h| h.cs).collect();
        let n = classifier
            .flag_shadow(&data.proteins, &mut data.genomes[0], 3, false, false)
            .unwrap();
        assert_eq!(n, 1);
        let after: Vec<i64> = data.genomes[0].hits.iter().map(|h| h.cs).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_pseudo() {
        let mut data = setup();
        {
            let genome = &mut data.genomes[0];
            genome.hits[0].n_exon = 3; // best A:1 hit is spliced
            genome.hits[4].frameshifts = 2;
        }
        let classifier = OverlapClassifier::new(0.5);
        classifier.flag_primary(&data.proteins, &mut data.genomes[0]);
        let n = classifier.flag_pseudo(&mut data.genomes[0]);
        assert_eq!(n, 2);
        let genome = &data.genomes[0];
        assert!(genome.hits[1].pseudo); // single-exon copy of A:1
        assert!(genome.hits[4].pseudo);
        assert!(!genome.hits[0].pseudo);
    }

    #[test]
    fn test_post_process_sorts_by_start() {
        let mut data = setup();
        post_process(&mut data, &OverlapClassifier::new(0.5)).unwrap();
        assert!(data.genomes[0].is_sorted_by_start());
        assert_eq!(data.genomes[0].hits.iter().filter(|h| h.shadow).count(), 1);
    }
}
