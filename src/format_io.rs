//! Writers for per-genome hit intervals (BED12) and the graph (GFA1)
use std::io::Write;

use crate::error::{PangeneError, Result};
use crate::graph::{PangeneGraph, VertexEnd};
use crate::hit::PangeneData;

fn strand(rev: bool) -> char {
    if rev {
        '-'
    } else {
        '+'
    }
}

/// Write the hits of one genome as BED12 in their current order
pub fn write_bed<W: Write>(data: &PangeneData, genome_idx: usize, out: &mut W) -> Result<()> {
    let genome = data.genomes.get(genome_idx).ok_or_else(|| {
        PangeneError::InvalidOption(format!(
            "genome index {genome_idx} out of range; {} genomes loaded",
            data.genomes.len()
        ))
    })?;

    for h in &genome.hits {
        let exons = genome.exons_of(h);
        write!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t0\t{}\t",
            genome.contigs[h.contig_id as usize].name,
            h.cs,
            h.ce,
            data.proteins[h.protein_id as usize].name,
            h.score,
            strand(h.rev),
            h.cs,
            h.ce,
            exons.len()
        )?;
        for e in exons {
            write!(out, "{},", e.len())?;
        }
        write!(out, "\t")?;
        for e in exons {
            write!(out, "{},", e.start)?;
        }
        writeln!(out, "\trk:i:{}\tfs:i:{}\tcm:i:{}", h.rank, h.frameshifts, h.cm)?;
    }
    Ok(())
}

/// Write vertices as segments and each arc pair as one link
pub fn write_gfa<W: Write>(data: &PangeneData, graph: &PangeneGraph, out: &mut W) -> Result<()> {
    // Longest protein per gene stands in for the segment length
    let mut gene_len = vec![0u32; data.n_gene()];
    for p in &data.proteins {
        let len = &mut gene_len[p.gene_id as usize];
        *len = (*len).max(p.len);
    }

    writeln!(out, "H\tVN:Z:1.0")?;
    for v in &graph.vertices {
        writeln!(
            out,
            "S\t{}\t*\tLN:i:{}\tpc:i:{}\tsc:i:{}",
            data.gene_name(v.gene_id),
            gene_len[v.gene_id as usize],
            v.pri,
            v.sec
        )?;
    }

    let name = |e: VertexEnd| data.gene_name(graph.vertices[e.vertex as usize].gene_id);
    for arc in graph.arcs.iter().filter(|a| a.key <= a.key.reverse()) {
        writeln!(
            out,
            "L\t{}\t{}\t{}\t{}\t0M\tdc:i:{}\tnc:i:{}\tdt:i:{}",
            name(arc.key.src),
            strand(arc.key.src.rev),
            name(arc.key.dst),
            strand(arc.key.dst.rev),
            arc.n_genome,
            arc.total_cnt,
            arc.avg_dist
        )?;
    }
    Ok(())
}
