use flate2::read::MultiGzDecoder;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{PangeneError, Result};
use crate::hit::{Exon, Genome, Hit, PangeneData};

/// Open a PAF file ("-" for stdin) and auto-detect gzip compression
pub fn open_paf_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).map_err(|source| PangeneError::Open {
        path: path.to_string(),
        source,
    })?;

    // Check by file extension; BGZF is multi-member gzip
    let is_compressed = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Decode a protein-to-genome CIGAR into exons.
///
/// Returns the exons in alignment order and the number of genomic bases
/// the CIGAR covers. Residue-level operations count three bases each.
/// Unknown operations are skipped. Fails if a length or the running
/// position overflows.
pub fn decode_cigar(cigar: &str) -> Result<(Vec<Exon>, i64)> {
    let overflow = || PangeneError::CigarOverflow(cigar.to_string());
    let mut exons = vec![Exon::default()];
    let mut x = 0i64;
    let mut n_fs = 0u32;
    let mut len = 0i64;

    for ch in cigar.bytes() {
        if ch.is_ascii_digit() {
            len = len
                .checked_mul(10)
                .and_then(|l| l.checked_add((ch - b'0') as i64))
                .ok_or_else(overflow)?;
            continue;
        }
        match ch {
            b'N' | b'U' | b'V' => {
                let next = x.checked_add(len).ok_or_else(overflow)?;
                // Splice-site shifted introns trim the flanking exons
                let (en, st) = match ch {
                    b'N' => Some((x, next)),
                    b'U' => x.checked_add(1).map(|en| (en, next - 2)),
                    _ => x.checked_add(2).map(|en| (en, next - 1)),
                }
                .ok_or_else(overflow)?;
                if let Some(last) = exons.last_mut() {
                    last.end = en;
                    last.frameshifts = n_fs;
                }
                exons.push(Exon {
                    start: st,
                    end: st,
                    frameshifts: 0,
                });
                x = next;
                n_fs = 0;
            }
            b'M' | b'X' | b'=' | b'D' => {
                x = len
                    .checked_mul(3)
                    .and_then(|bases| x.checked_add(bases))
                    .ok_or_else(overflow)?;
            }
            b'F' | b'G' => {
                x = x.checked_add(len).ok_or_else(overflow)?;
                n_fs += 1;
            }
            _ => {}
        }
        len = 0;
    }

    if let Some(last) = exons.last_mut() {
        last.end = x;
        last.frameshifts = n_fs;
    }
    Ok((exons, x))
}

/// Mirror exon offsets against the alignment span and reverse their order
pub fn mirror_exons(exons: &[Exon], span: i64) -> Vec<Exon> {
    exons
        .iter()
        .rev()
        .map(|e| Exon {
            start: span - e.end,
            end: span - e.start,
            frameshifts: e.frameshifts,
        })
        .collect()
}

/// Positional fields of one PAF line, validated before anything is interned
struct PafRecord<'a> {
    query_name: &'a str,
    query_len: u32,
    query_start: u32,
    query_end: u32,
    rev: bool,
    contig_name: &'a str,
    contig_len: u64,
    contig_start: i64,
    contig_end: i64,
    matches: u32,
    block_len: u32,
    score: i32,
    cigar: Option<&'a str>,
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], i: usize, what: &str, line: usize) -> Result<T> {
    fields[i].parse().map_err(|_| PangeneError::Malformed {
        line,
        reason: format!("invalid {what} '{}'", fields[i]),
    })
}

/// Parse one line; `Ok(None)` means the record is skipped.
///
/// Only the positional fields and the tags we read must be UTF-8; other
/// tags are never decoded.
fn parse_paf_line(line: &[u8], line_no: usize) -> Result<Option<PafRecord<'_>>> {
    let raw: Vec<&[u8]> = line.split(|&b| b == b'\t').collect();

    if raw.len() < 12 {
        return Err(PangeneError::Malformed {
            line: line_no,
            reason: format!("PAF line has {} fields; at least 12 required", raw.len()),
        });
    }

    let fields = raw[..11]
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            std::str::from_utf8(f).map_err(|_| PangeneError::Malformed {
                line: line_no,
                reason: format!("field {} is not valid UTF-8", i + 1),
            })
        })
        .collect::<Result<Vec<&str>>>()?;

    let rev = match fields[4] {
        "+" => false,
        "-" => true,
        _ => return Ok(None),
    };

    let mut paf = PafRecord {
        query_name: fields[0],
        query_len: parse_field(&fields, 1, "query length", line_no)?,
        query_start: parse_field(&fields, 2, "query start", line_no)?,
        query_end: parse_field(&fields, 3, "query end", line_no)?,
        rev,
        contig_name: fields[5],
        contig_len: parse_field(&fields, 6, "contig length", line_no)?,
        contig_start: parse_field(&fields, 7, "contig start", line_no)?,
        contig_end: parse_field(&fields, 8, "contig end", line_no)?,
        matches: parse_field(&fields, 9, "match length", line_no)?,
        block_len: parse_field(&fields, 10, "block length", line_no)?,
        score: 0,
        cigar: None,
    };

    // Tags we don't understand, or can't decode, are ignored
    for &field in &raw[12..] {
        if let Some(val) = field.strip_prefix(b"ms:i:") {
            if let Some(score) = std::str::from_utf8(val).ok().and_then(|v| v.parse().ok()) {
                paf.score = score;
            }
        } else if let Some(val) = field.strip_prefix(b"cg:Z:") {
            if let Ok(cigar) = std::str::from_utf8(val) {
                paf.cigar = Some(cigar);
            }
        }
    }

    Ok(Some(paf))
}

/// Read one genome's alignments and append it to the store.
///
/// On error nothing is appended. Names interned by records before the
/// failing line stay in the dictionaries.
pub fn parse_genome<R: BufRead>(
    data: &mut PangeneData,
    mut reader: R,
    label: &str,
    gene_sep: char,
) -> Result<usize> {
    let mut genome = Genome::new(label);
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut n_skipped = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let mut trimmed = buf.as_slice();
        while let [rest @ .., b'\n' | b'\r'] = trimmed {
            trimmed = rest;
        }
        if trimmed.is_empty() {
            continue;
        }

        let paf = match parse_paf_line(trimmed, line_no)? {
            Some(paf) => paf,
            None => {
                n_skipped += 1;
                continue;
            }
        };
        let Some(cigar) = paf.cigar else {
            debug!("{label}:{line_no}: no cg:Z: tag, skipping {}", paf.query_name);
            n_skipped += 1;
            continue;
        };

        let (exons, span) = decode_cigar(cigar).map_err(|e| PangeneError::Malformed {
            line: line_no,
            reason: e.to_string(),
        })?;
        let declared = paf
            .contig_end
            .checked_sub(paf.contig_start)
            .ok_or_else(|| PangeneError::Malformed {
                line: line_no,
                reason: format!("contig span {}..{} overflows", paf.contig_start, paf.contig_end),
            })?;
        if span != declared {
            return Err(PangeneError::SpanMismatch {
                line: line_no,
                query: paf.query_name.to_string(),
                decoded: span,
                declared,
            });
        }
        let exons = if paf.rev { mirror_exons(&exons, span) } else { exons };

        let protein_id = data.add_protein(paf.query_name, paf.query_len, gene_sep);
        let contig_id = genome.add_contig(paf.contig_name, paf.contig_len);
        let hit = Hit {
            protein_id,
            contig_id,
            qs: paf.query_start,
            qe: paf.query_end,
            cs: paf.contig_start,
            ce: paf.contig_end,
            cm: Hit::anchor(paf.contig_start, paf.contig_end),
            rev: paf.rev,
            mlen: paf.matches,
            blen: paf.block_len,
            score: paf.score,
            ..Default::default()
        };
        genome.push_hit(hit, &exons);
    }

    if n_skipped > 0 {
        warn!("{label}: skipped {n_skipped} records without strand or CIGAR");
    }
    info!(
        "read {} hits on {} contigs from {}",
        genome.hits.len(),
        genome.contigs.len(),
        label
    );
    let n_hit = genome.hits.len();
    data.genomes.push(genome);
    Ok(n_hit)
}

/// Open and read one genome from a path ("-" for stdin)
pub fn read_paf(data: &mut PangeneData, path: &str, gene_sep: char) -> Result<usize> {
    let input = open_paf_input(path)?;
    parse_genome(data, input, path, gene_sep)
}
