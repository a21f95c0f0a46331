//! Glue file reading and writing.
//!
//! A Glue file is the vector on its first line, as comma-separated
//! integers where `@` repeats the previous value, followed by
//! `//KEY:VALUE` metadata lines:
//!
//! ```text
//! 2,3,@,@,5
//! //STROBE_PICOSECONDS:5000.0
//! //HARDWARE:PXI1Slot5/NI6583/se_io
//! ```

use std::fs::File;
use std::io::{ self, BufRead, BufReader, BufWriter, Write };
use std::path::Path;
use crate::error::{ GlueError, GlueResult };
use crate::hwpath::HwPath;
use crate::wave::GlueWave;

pub const STROBE_KEY: &str = "STROBE_PICOSECONDS";
pub const HARDWARE_KEY: &str = "HARDWARE";
/// Token standing for "same as the previous element".
pub const REPEAT_TOKEN: &str = "@";
/// Waves longer than this report write progress.
pub const PROGRESS_THRESHOLD: usize = 10000;

/// Encode a vector with the `@` run shorthand.
pub fn encode_vector(vector: &[u64], out: &mut impl Write) -> io::Result<()> {
    encode_vector_with_progress(vector, out, |_, _| {})
}

fn encode_vector_with_progress(
    vector: &[u64], out: &mut impl Write,
    mut progress: impl FnMut(usize, usize)
) -> io::Result<()> {
    let report = vector.len() > PROGRESS_THRESHOLD;
    let mut prev = None;
    for (i, &v) in vector.iter().enumerate() {
        if i != 0 {
            out.write_all(b",")?;
        }
        if prev == Some(v) {
            out.write_all(REPEAT_TOKEN.as_bytes())?;
        }
        else {
            write!(out, "{}", v)?;
        }
        prev = Some(v);
        if report && (i + 1) % PROGRESS_THRESHOLD == 0 {
            progress(i + 1, vector.len());
        }
    }
    if report && vector.len() % PROGRESS_THRESHOLD != 0 {
        progress(vector.len(), vector.len());
    }
    Ok(())
}

/// Decode the first line of a Glue file.
pub fn decode_vector(line: &str) -> GlueResult<Vec<u64>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let mut vector = Vec::with_capacity(line.len() / 2 + 1);
    for (i, tok) in line.split(',').enumerate() {
        let tok = tok.trim();
        if tok == REPEAT_TOKEN {
            match vector.last() {
                Some(&prev) => vector.push(prev),
                None => return Err(GlueError::GlueFormat {
                    line: 1,
                    reason: "vector starts with a repeat token".into()
                })
            }
        }
        else {
            let v = tok.parse::<u64>().map_err(|_| GlueError::GlueFormat {
                line: 1,
                reason: format!("bad token \"{}\" at element {}", tok, i)
            })?;
            vector.push(v);
        }
    }
    Ok(vector)
}

/// Write a wave in Glue format.
pub fn write_glue_to(wave: &GlueWave, out: &mut impl Write) -> io::Result<()> {
    write_glue_with_progress(wave, out, |_, _| {})
}

/// Write a wave in Glue format, calling `progress(done, total)` every
/// `PROGRESS_THRESHOLD` elements when the wave is longer than that.
pub fn write_glue_with_progress(
    wave: &GlueWave, out: &mut impl Write,
    progress: impl FnMut(usize, usize)
) -> io::Result<()> {
    encode_vector_with_progress(&wave.vector, out, progress)?;
    out.write_all(b"\n")?;
    writeln!(out, "//{}:{:?}", STROBE_KEY, wave.strobe_ps)?;
    if let Some(hw) = &wave.hardware {
        writeln!(out, "//{}:{}", HARDWARE_KEY, hw)?;
    }
    for (k, v) in &wave.metadata {
        writeln!(out, "//{}:{}", k, v)?;
    }
    Ok(())
}

/// Write a wave to a Glue file.
pub fn write_glue(wave: &GlueWave, path: impl AsRef<Path>) -> io::Result<()> {
    write_glue_file_with_progress(wave, path, |_, _| {})
}

/// Write a wave to a Glue file, reporting progress as
/// `write_glue_with_progress` does. The file is flushed before
/// returning so that write failures are not lost.
pub fn write_glue_file_with_progress(
    wave: &GlueWave, path: impl AsRef<Path>,
    progress: impl FnMut(usize, usize)
) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write_glue_with_progress(wave, &mut f, progress)?;
    f.flush()
}

/// Parse a Glue file from a reader.
///
/// Missing strobe or hardware lines are tolerated with a warning; the
/// strobe then decodes as 0 and the hardware as unset.
pub fn read_glue_from(rd: impl BufRead) -> GlueResult<GlueWave> {
    let mut lines = rd.lines();
    let first = match lines.next() {
        Some(l) => l?,
        None => return Err(GlueError::GlueFormat {
            line: 1, reason: "empty file".into()
        })
    };
    let vector = decode_vector(&first)?;
    let mut wave = GlueWave::new(vector, 0.0, None);
    let mut strobe = None;

    for (idx, line) in lines.enumerate() {
        let line = line?;
        let lineno = idx + 2;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix("//") else {
            clilog::warn!(
                GC_GLUE_LINE,
                "glue line {} is not a //KEY:VALUE line, ignored", lineno
            );
            continue;
        };
        let Some((key, value)) = body.split_once(':') else {
            clilog::warn!(
                GC_GLUE_LINE,
                "glue line {} has no KEY:VALUE separator, ignored", lineno
            );
            continue;
        };
        match key.trim() {
            STROBE_KEY => {
                let s = value.trim().parse::<f64>()
                    .map_err(|_| GlueError::GlueFormat {
                        line: lineno,
                        reason: format!("bad strobe \"{}\"", value)
                    })?;
                strobe = Some(s);
            }
            HARDWARE_KEY => {
                wave.hardware = Some(HwPath::parse(value));
            }
            k => {
                wave.metadata.insert(k.into(), value.to_string());
            }
        }
    }

    match strobe {
        Some(s) => wave.strobe_ps = s,
        None => {
            clilog::warn!(GC_GLUE_META, "glue file has no {} line", STROBE_KEY);
        }
    }
    if wave.hardware.is_none() {
        clilog::warn!(GC_GLUE_META, "glue file has no {} line", HARDWARE_KEY);
    }
    Ok(wave)
}

/// Read a Glue file.
pub fn read_glue(path: impl AsRef<Path>) -> GlueResult<GlueWave> {
    let f = File::open(path)?;
    read_glue_from(BufReader::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(v: &[u64]) -> String {
        let mut buf = Vec::new();
        encode_vector(v, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn run_shorthand() {
        assert_eq!(encode(&[5, 5, 5, 5]), "5,@,@,@");
        assert_eq!(encode(&[1, 2, 2, 3, 3, 3, 1]), "1,2,@,3,@,@,1");
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[0]), "0");
    }

    #[test]
    fn decode_inverts_encode() {
        let long_run = vec![9u64; 50000];
        let cases: [&[u64]; 5] = [
            &[], &[7], &[4, 4, 4, 4, 4], &[0, 1, 2, 3, 4, 5], &long_run
        ];
        for v in cases {
            assert_eq!(decode_vector(&encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_vector("1,x,3"),
                         Err(GlueError::GlueFormat { line: 1, .. })));
        assert!(matches!(decode_vector("@,1"),
                         Err(GlueError::GlueFormat { line: 1, .. })));
        assert!(decode_vector("1,,2").is_err());
    }

    #[test]
    fn file_layout() {
        let mut wave = GlueWave::new(
            vec![2, 2, 0], 5000.0,
            Some(HwPath::parse("PXI1Slot5/NI6583/se_io")));
        wave.metadata.insert("GLUE_TIMESTEPS".into(), "3".into());
        let mut buf = Vec::new();
        write_glue_to(&wave, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2,@,0\n\
             //STROBE_PICOSECONDS:5000.0\n\
             //HARDWARE:PXI1Slot5/NI6583/se_io\n\
             //GLUE_TIMESTEPS:3\n"
        );
    }

    #[test]
    fn round_trip_through_reader() {
        let mut wave = GlueWave::new(
            vec![2, 3, 0, 5, 4, 5, 6, 7], 1234.5,
            Some(HwPath::parse("PXI1Slot5/NI6583/se_io")));
        wave.metadata.insert("NOTE".into(), "a:b".into());
        let mut buf = Vec::new();
        write_glue_to(&wave, &mut buf).unwrap();
        let back = read_glue_from(&buf[..]).unwrap();
        assert_eq!(back, wave);
        assert_eq!(back.metadata["NOTE"], "a:b");
    }

    #[test]
    fn missing_metadata_is_tolerated() {
        let w = read_glue_from(&b"1,@,2\n"[..]).unwrap();
        assert_eq!(w.vector, [1, 1, 2]);
        assert_eq!(w.hardware, None);
        assert_eq!(w.strobe_ps, 0.0);
    }

    #[test]
    fn progress_only_for_long_waves() {
        let mut calls = Vec::new();
        let short = GlueWave::new(vec![1; 10], 1.0, None);
        write_glue_with_progress(&short, &mut io::sink(),
                                 |d, t| calls.push((d, t))).unwrap();
        assert!(calls.is_empty());
        let long = GlueWave::new(vec![1; 25000], 1.0, None);
        write_glue_with_progress(&long, &mut io::sink(),
                                 |d, t| calls.push((d, t))).unwrap();
        assert_eq!(calls, [(10000, 25000), (20000, 25000), (25000, 25000)]);
    }
}
