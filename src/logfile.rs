use crate::error::Result;
use crate::ident::ModIdent;
use std::path::Path;

/// Extracts the active mod set from a game log. The loader prints one
/// `Checksum of <name>: <crc>` line per loaded mod in a single contiguous
/// block; the first non-matching line after the block ends the scan. `base`
/// is always active and is excluded from the result. Versions are not
/// recorded in the log, so every identifier comes back unversioned.
pub fn parse(path: &Path) -> Result<Vec<ModIdent>> {
    Ok(parse_lines(std::fs::read_to_string(path)?.lines()))
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<ModIdent> {
    let mut mods = Vec::new();
    let mut in_checksums = false;
    for line in lines {
        let Some((_, rest)) = line.split_once("Checksum of ") else {
            if in_checksums {
                break;
            }
            continue;
        };
        in_checksums = true;
        // `<name>: <crc>`, where the name itself may contain spaces.
        let Some((name, _)) = rest.rsplit_once(": ") else {
            continue;
        };
        if name == "base" {
            continue;
        }
        mods.push(ModIdent::new(name, None));
    }
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOG: &str = "\
   0.001 Program arguments: \"factorio\"
   0.450 Loading mod core 0.0.0 (data.lua)
   0.477 Checksum for core: 2630831588
   0.477 Checksum of base: 2263272780
   0.481 Checksum of flib: 3093600683
   0.484 Checksum of Recipe Book: 2437378043
   0.512 Info PlayerData.cpp:70: Local player-data.json unavailable
   0.900 Checksum of late-mod: 1111111111
";

    #[test]
    fn extracts_the_contiguous_checksum_block() {
        let mods = parse_lines(LOG.lines());
        let names: Vec<&str> = mods.iter().map(|m| m.name.as_str()).collect();
        // The block ends at the first non-matching line; the later
        // checksum line is not part of the loaded set.
        assert_eq!(names, ["flib", "Recipe Book"]);
        assert!(mods.iter().all(|m| m.version.is_none()));
    }

    #[test]
    fn no_checksum_lines_yields_an_empty_set() {
        assert!(parse_lines("0.001 nothing here\n0.002 still nothing".lines()).is_empty());
    }
}
