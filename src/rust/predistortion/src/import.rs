// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::filters::IirCoefficients;
use crate::{Error, Result};

/// Parse an IIR coefficient table into cascaded filter sections.
///
/// The table carries one section per row with columns `a1,b0,b1`, separated
/// by commas or whitespace. Blank lines and `#` comments are skipped. The
/// sign flip of the feedback coefficient is baked in here: a row
/// `(a1, b0, b1)` becomes the section `a = [1, -a1]`, `b = [b0, b1]`, the
/// form expected by [`crate::filters::filter_iir`].
pub fn parse_iir_table(source: &str) -> Result<IirCoefficients> {
    let mut a = Vec::new();
    let mut b = Vec::new();
    for (lineno, raw_line) in source.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<f64> = line
            .split([',', ' ', '\t'])
            .filter(|field| !field.is_empty())
            .map(|field| {
                field.parse::<f64>().map_err(|_| {
                    Error::new(format!(
                        "invalid coefficient '{}' in IIR table line {}",
                        field,
                        lineno + 1
                    ))
                })
            })
            .collect::<Result<_>>()?;
        if fields.len() != 3 {
            return Err(Error::new(format!(
                "IIR table line {} has {} columns, expected 3 (a1,b0,b1)",
                lineno + 1,
                fields.len()
            )));
        }
        a.push(vec![1.0, -fields[0]]);
        b.push(vec![fields[1], fields[2]]);
    }
    if a.is_empty() {
        return Err(Error::new("IIR table contains no coefficient rows"));
    }
    Ok(IirCoefficients { a, b })
}
