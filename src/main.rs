use std::time::Instant;

use crg_engine::Engine;

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: crg-engine <file.crg>");
        std::process::exit(2);
    };

    let mut engine = Engine::new();
    let ds = match engine.load_file(&path) {
        Ok(ds) => ds,
        Err(err) => {
            eprintln!("cannot load {}: {}", path, err);
            std::process::exit(1);
        }
    };
    let cp = engine.create_contact_point(ds).unwrap();

    let u = engine.u_range(ds).unwrap();
    let v = engine.v_range(ds).unwrap();
    println!(
        "Loaded {}: u = [{:.3}, {:.3}] m, v = [{:.3}, {:.3}] m, closed: {}",
        path,
        u.min,
        u.max,
        v.min,
        v.max,
        engine.closed_track(ds).unwrap().is_some(),
    );

    println!("Evaluating...");
    const NUM_QUERIES: u32 = 100_000;
    for _ in 0..3 {
        let start = Instant::now();
        let mut sum = 0.0;
        for i in 0..NUM_QUERIES {
            let t = i as f64 / NUM_QUERIES as f64;
            let (x, y) = engine.uv2xy(cp, u.lerp(t), v.lerp(0.5)).unwrap();
            sum += engine.xy2z(cp, x, y).unwrap_or(0.0);
        }
        let query = start.elapsed() / NUM_QUERIES;
        println!(
            "Avg. query: {:?} --> {:.0} queries/s (mean z {:.4} m)",
            query,
            1.0 / query.as_secs_f64(),
            sum / NUM_QUERIES as f64,
        )
    }
}
