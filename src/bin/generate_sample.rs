/// Generates the repository-default sample dataset: a deterministic table
/// of clinic waiting times with year / district / facility columns, written
/// as `data/clinic_waitlist_sample.csv` so the app has something to open
/// out of the box.

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let years = [2020i64, 2021, 2022];
    let districts = ["North", "South", "East", "West"];
    let facilities = ["Polyclinic 1", "Polyclinic 2", "Diagnostic Center", "City Hospital"];
    let referral_types = ["routine", "urgent"];

    // Base waiting time per district, drifting down year over year.
    let district_base = [18.0, 24.0, 15.0, 21.0];

    let output_path = "data/clinic_waitlist_sample.csv";
    std::fs::create_dir_all("data").expect("Failed to create data directory");
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["year", "district", "facility", "referral", "visits", "wait_days"])
        .expect("Failed to write header");

    let mut rows = 0usize;
    for (yi, &year) in years.iter().enumerate() {
        for (di, district) in districts.iter().enumerate() {
            for facility in &facilities {
                for referral in &referral_types {
                    let base = district_base[di] - 2.5 * yi as f64;
                    let urgent = *referral == "urgent";
                    let mean_wait = if urgent { base * 0.4 } else { base };
                    let wait_days = rng.gauss(mean_wait, 2.0).max(0.5);
                    let visits = 40 + (rng.next_u64() % 160) as i64;

                    // Sprinkle a few gaps so null handling has something to do.
                    let wait_field = if rng.next_f64() < 0.03 {
                        String::new()
                    } else {
                        format!("{wait_days:.1}")
                    };

                    writer
                        .write_record([
                            year.to_string(),
                            district.to_string(),
                            facility.to_string(),
                            referral.to_string(),
                            visits.to_string(),
                            wait_field,
                        ])
                        .expect("Failed to write row");
                    rows += 1;
                }
            }
        }
    }

    writer.flush().expect("Failed to flush CSV");
    println!("Wrote {rows} rows to {output_path}");
}
