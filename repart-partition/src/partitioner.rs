// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use crate::border::{BorderArray, BorderArrayBuilder};
use once_cell::sync::OnceCell;
use repart_types::{Error, Index, Range, Result, Space};
use std::sync::Arc;

/// Everything a partitioner's callback needs to do its job: how many
/// tasks it is splitting work across, the space being partitioned, the
/// builder to append slices to, and (when the partitioner requires one)
/// the base partitioning's already-validated border array.
pub struct PartitionerContext<'a> {
    pub group_size: usize,
    pub space: &'a Space,
    pub border: &'a mut BorderArrayBuilder,
    pub base: Option<&'a BorderArray>,
}

type RunFn = dyn Fn(&mut PartitionerContext) -> Result<()> + Send + Sync;

/// A deterministic function from `(group, space, base?)` to a border
/// array, plus opaque state closed over by the callback (the Rust
/// equivalent of the source's `run` function pointer + user-data pair).
#[derive(Clone)]
pub struct Partitioner {
    name: Arc<str>,
    requires_base: bool,
    run: Arc<RunFn>,
}

impl std::fmt::Debug for Partitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partitioner").field("name", &self.name).finish()
    }
}

impl Partitioner {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires_base(&self) -> bool {
        self.requires_base
    }

    pub fn new_custom(
        name: impl Into<Arc<str>>,
        requires_base: bool,
        run: impl Fn(&mut PartitionerContext) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Partitioner {
            name: name.into(),
            requires_base,
            run: Arc::new(run),
        }
    }

    pub fn run(&self, ctx: &mut PartitionerContext) -> Result<()> {
        if self.requires_base && ctx.base.is_none() {
            return Err(Error::precondition_failed(format!(
                "partitioner {:?} requires a base partitioning",
                self.name
            )));
        }
        (self.run)(ctx)
    }
}

fn build_all() -> Partitioner {
    Partitioner::new_custom("all", false, |ctx| {
        for t in 0..ctx.group_size {
            let full = Range::new(ctx.space.clone(), zero_index(ctx.space), full_index(ctx.space))?;
            ctx.border.push(t, full, 0);
        }
        Ok(())
    })
}

fn build_master() -> Partitioner {
    Partitioner::new_custom("master", false, |ctx| {
        let full = Range::new(ctx.space.clone(), zero_index(ctx.space), full_index(ctx.space))?;
        ctx.border.push(0, full, 0);
        Ok(())
    })
}

/// Appends the full space as one range for every task in `[0, group_size)`.
/// Built fresh on every call; reach for [`Registry`] instead when the
/// caller wants a lazily-initialised, shared singleton.
pub fn new_all() -> Partitioner {
    build_all()
}

/// Appends the full space for task 0 only. Built fresh on every call; see
/// [`Registry`] for the cached form.
pub fn new_master() -> Partitioner {
    build_master()
}

/// A once-guarded, lazily-built cache of the `all`/`master` built-in
/// partitioners, scoped to an explicit handle rather than a process-wide
/// global, so tests stay hermetic: each test (or application) owns its
/// own `Registry` instead of every caller in the process sharing one
/// cell that the first caller happens to initialise.
#[derive(Debug, Default)]
pub struct Registry {
    all: OnceCell<Partitioner>,
    master: OnceCell<Partitioner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `all` partitioner, built on first use and cached for the
    /// lifetime of this registry.
    pub fn all(&self) -> Partitioner {
        self.all.get_or_init(build_all).clone()
    }

    /// The `master` partitioner, built on first use and cached for the
    /// lifetime of this registry.
    pub fn master(&self) -> Partitioner {
        self.master.get_or_init(build_master).clone()
    }
}

/// Given a base partitioning's border array, for each of its slices
/// appends a slice spanning the whole space but with dimension `to_dim`
/// replaced by the base slice's `from_dim` extent, preserving the task id.
pub fn new_copy(from_dim: usize, to_dim: usize) -> Partitioner {
    Partitioner::new_custom(format!("copy({from_dim}->{to_dim})"), true, move |ctx| {
        let base = ctx.base.expect("requires_base checked by Partitioner::run");
        for i in 0..base.count() {
            let slice = base.get(i);
            let mut from = *zero_index(ctx.space).coords();
            let mut to = *full_index(ctx.space).coords();
            from[to_dim] = slice.range.from.get(from_dim);
            to[to_dim] = slice.range.to.get(from_dim);
            let dims = ctx.space.dims();
            let range = Range::new(
                ctx.space.clone(),
                make_index(dims, from),
                make_index(dims, to),
            )?;
            ctx.border.push(slice.task, range, 0);
        }
        Ok(())
    })
}

/// Weight function over index positions `[0, size)` on the partitioned
/// dimension.
pub type IndexWeight = Arc<dyn Fn(u64) -> f64 + Send + Sync>;
/// Weight function over task ids `[0, group_size)`.
pub type TaskWeight = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// 1-D block partitioner: splits the `pdim`-th axis into contiguous
/// segments whose weighted sums are balanced across `group_size` tasks
/// over `cycles` passes. See the distribution algorithm in the design.
pub fn new_block_1d(
    pdim: usize,
    cycles: u32,
    idx_weight: Option<IndexWeight>,
    task_weight: Option<TaskWeight>,
) -> Partitioner {
    assert!(cycles >= 1, "cycles must be >= 1");
    Partitioner::new_custom("block_1d", false, move |ctx| {
        let n = ctx.group_size;
        if n == 0 {
            return Err(Error::invalid_argument("block partitioner needs a non-empty group"));
        }
        let size = ctx.space.size(pdim);
        let idx_w = |i: u64| idx_weight.as_ref().map_or(1.0, |f| f(i));
        let task_w = |t: usize| task_weight.as_ref().map_or(1.0, |f| f(t));

        let total_w: f64 = (0..size).map(idx_w).sum();
        let total_tw: f64 = (0..n).map(task_w).sum();
        let per_part = total_w / n as f64 / cycles as f64;
        let task_factor = |t: usize| task_w(t) * n as f64 / total_tw;

        let mut w = -0.5f64;
        let mut t = 0usize;
        let mut c = 0u32;
        let mut slice_from: i64 = 0;
        let last = (n - 1, cycles - 1);

        for i in 0..size {
            w += idx_w(i);
            while w >= per_part * task_factor(t) && (t, c) != last {
                let i_signed = i as i64;
                if i_signed > slice_from {
                    emit_block_slice(ctx, pdim, slice_from, i_signed, t)?;
                }
                w -= per_part * task_factor(t);
                t += 1;
                if t == n {
                    t = 0;
                    c += 1;
                }
                slice_from = i_signed;
            }
        }
        let size_signed = size as i64;
        if size_signed > slice_from {
            emit_block_slice(ctx, pdim, slice_from, size_signed, t)?;
        }
        Ok(())
    })
}

fn emit_block_slice(
    ctx: &mut PartitionerContext,
    pdim: usize,
    from_v: i64,
    to_v: i64,
    task: usize,
) -> Result<()> {
    let dims = ctx.space.dims();
    let mut from = *zero_index(ctx.space).coords();
    let mut to = *full_index(ctx.space).coords();
    from[pdim] = from_v;
    to[pdim] = to_v;
    let range = Range::new(ctx.space.clone(), make_index(dims, from), make_index(dims, to))?;
    ctx.border.push(task, range, 0);
    Ok(())
}

fn zero_index(space: &Space) -> Index {
    make_index(space.dims(), [0, 0, 0])
}

fn full_index(space: &Space) -> Index {
    let s = space.sizes();
    make_index(space.dims(), [s[0] as i64, s[1] as i64, s[2] as i64])
}

fn make_index(dims: usize, coords: [i64; 3]) -> Index {
    match dims {
        1 => Index::new_1d(coords[0]),
        2 => Index::new_2d(coords[0], coords[1]),
        _ => Index::new_3d(coords[0], coords[1], coords[2]),
    }
}
