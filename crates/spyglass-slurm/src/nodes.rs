use crate::queue::SlurmError;

/// Expand Slurm's compressed node-list notation into individual hostnames.
///
/// `n[01-03,07]` becomes `n01 n02 n03 n07`. A name with no bracket group is
/// a single host; an empty field (a job with no allocation yet) expands to
/// nothing. Zero-padded range bounds keep their padding.
pub fn expand_node_list(raw: &str) -> Result<Vec<String>, SlurmError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let Some(open) = raw.find('[') else {
        return Ok(vec![raw.to_string()]);
    };

    let base = &raw[..open];
    let groups = raw[open + 1..].trim_end_matches(']');

    let mut nodes = Vec::new();
    for group in groups.split(',') {
        match group.split_once('-') {
            None => nodes.push(format!("{base}{group}")),
            Some((lo, hi)) => {
                let start: u64 = lo
                    .parse()
                    .map_err(|_| SlurmError::MalformedOutput(raw.to_string()))?;
                let end: u64 = hi
                    .parse()
                    .map_err(|_| SlurmError::MalformedOutput(raw.to_string()))?;
                if end < start {
                    return Err(SlurmError::MalformedOutput(raw.to_string()));
                }
                let width = if lo.starts_with('0') { lo.len() } else { 0 };
                for idx in start..=end {
                    nodes.push(format!("{base}{idx:0width$}"));
                }
            }
        }
    }

    Ok(nodes)
}
