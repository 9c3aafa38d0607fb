use gridrunner::{Cell, CycleStrategy, Direction, FallbackCycle, Grid};

pub fn run_cycle(width: u32, height: u32, strategy: CycleStrategy, list: bool) -> Result<(), String> {
    let grid = Grid::new(width, height).map_err(|e| e.to_string())?;
    let cycle = FallbackCycle::build(grid, strategy).map_err(|e| e.to_string())?;

    match cycle.spare() {
        Some(spare) => println!(
            "{} tour on {}x{}: {} of {} cells, skips {}",
            strategy,
            width,
            height,
            cycle.len(),
            grid.cell_count(),
            spare
        ),
        None => println!(
            "{} tour on {}x{}: {} cells, closed",
            strategy,
            width,
            height,
            cycle.len()
        ),
    }
    print!("{}", render_arrows(&grid, &cycle));

    if list {
        for (i, cell) in cycle.cells().iter().enumerate() {
            println!("{:>5} {}", i, cell);
        }
    }
    Ok(())
}

/// Each cell drawn as the direction to its successor; the skipped cell as `x`.
fn render_arrows(grid: &Grid, cycle: &FallbackCycle) -> String {
    let mut out = String::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let cell = Cell::new(x, y);
            let ch = if cycle.spare() == Some(cell) {
                'x'
            } else {
                match Direction::between(cell, cycle.next_after(cell)) {
                    Some(Direction::Up) => '^',
                    Some(Direction::Down) => 'v',
                    Some(Direction::Left) => '<',
                    Some(Direction::Right) => '>',
                    None => '?',
                }
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_trace_the_sweep() {
        let grid = Grid::new(4, 2).unwrap();
        let cycle = FallbackCycle::build(grid, CycleStrategy::Boustrophedon).unwrap();
        assert_eq!(render_arrows(&grid, &cycle), ">>>v\n^<<<\n");
    }

    #[test]
    fn skipped_corner_is_marked() {
        let grid = Grid::new(3, 3).unwrap();
        let cycle = FallbackCycle::build(grid, CycleStrategy::Boustrophedon).unwrap();
        assert_eq!(render_arrows(&grid, &cycle), ">>v\n^v<\n^<x\n");
    }
}
