/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Per-rank, per-step debug dumps.

use crate::scene::Scene;
use crate::FailResult;
use bopcalc_array_types::V3;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The dump filename for one rank and step.
pub fn dump_path(directory: &Path, rank: usize, step: u64) -> PathBuf {
    directory.join(format!("dump_{}_{}.txt", rank, step))
}

/// Write positions, forces, and sorted neighbor lists with distances.
pub fn write_dump(
    directory: &Path,
    rank: usize,
    step: u64,
    scene: &Scene<'_>,
    forces: Option<&[V3]>,
) -> FailResult<()> {
    let path = dump_path(directory, rank, step);
    let mut out = BufWriter::new(File::create(&path)?);

    writeln!(out, "step {} rank {}", step, rank)?;
    writeln!(out, "atoms {}", scene.atoms.len())?;
    for (index, atom) in scene.atoms.iter().enumerate() {
        let p = atom.position;
        write!(out, "{:6} {:2} {:18.12} {:18.12} {:18.12}", index, atom.symbol, p[0], p[1], p[2])?;
        if let Some(forces) = forces {
            let f = forces[index];
            write!(out, "  {:18.12} {:18.12} {:18.12}", f[0], f[1], f[2])?;
        }
        writeln!(out)?;
    }

    writeln!(out, "neighbor lists")?;
    for index in 0..scene.atoms.len() {
        let mut entries: Vec<_> = scene.tables.neighbors(index).iter()
            .map(|&(neighbor, offset)| {
                let distance = scene.separation(index, neighbor, offset).norm();
                (neighbor, offset, distance)
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.0, a.1).cmp(&(b.0, b.1))
        });

        write!(out, "{:6}:", index)?;
        for (neighbor, offset, distance) in entries {
            write!(
                out, " ({} [{},{},{}] {:.9})",
                neighbor, offset[0], offset[1], offset[2], distance,
            )?;
        }
        writeln!(out)?;
    }

    debug!("wrote debug dump to {}", path.display());
    Ok(())
}
