use std::time::SystemTime;

use cobalt::{Compilation, CompileOptions, CoreLibrary, TokenProvider};

const SAMPLE: &str = r#"
using System;

namespace Playground {
	public delegate int Step(int value);

	public class Counter {
		int count = 0;
		public event Step Stepped;

		public int Count { get { return count; } }

		public void Advance(int by) {
			count = count + by;
			if (Stepped != null) {
				count = Stepped(count);
			}
		}
	}

	public class Program {
		public static int Run() {
			Counter counter = new Counter();
			counter.Stepped += new Step(Program.Echo);
			int[] steps = new int[] { 1, 2, 3 };
			foreach (int step in steps) {
				counter.Advance(step);
			}
			return counter.Count;
		}

		public static int Echo(int value) {
			return value;
		}
	}
}
"#;

fn main() {
	tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

	let start = SystemTime::now();
	let mut compilation = Compilation::new(CompileOptions::default(), CoreLibrary::new(), TokenProvider::new());
	compilation.add_source("sample.cob", SAMPLE);
	let result = compilation.resolve();

	println! {
		"Front-end time: {:?}, types: {}",
		start.elapsed().unwrap(),
		compilation.type_decls().count(),
	}

	compilation.reporter.write_all(&compilation.pool, &mut std::io::stdout().lock()).unwrap();
	if result.is_err() {
		std::process::exit(1);
	}
}
