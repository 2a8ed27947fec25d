use std::io::{stdout, Write};
use std::time::Instant;

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;

pub fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

struct Progress {
    label: String,
    processed_items: usize,
    total_items: usize,
    started_at: Instant,
    last_printed_at: Instant,
}

impl Progress {
    fn new(label: String, total_items: usize) -> Progress {
        Progress {
            label,
            processed_items: 0,
            total_items,
            started_at: Instant::now(),
            last_printed_at: Instant::now(),
        }
    }

    // Returns the final line when done
    fn next(&mut self) -> Option<(f64, String)> {
        self.processed_items += 1;
        if self.processed_items > self.total_items {
            panic!(
                "{} is too few items for {} progress",
                prettyprint_usize(self.total_items),
                self.label
            );
        }

        if self.processed_items == self.total_items {
            let elapsed = elapsed_seconds(self.started_at);
            let line = format!(
                "{} ({})... {}",
                self.label,
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed)
            );
            println!("\r{}", line);
            return Some((elapsed, line));
        } else if elapsed_seconds(self.last_printed_at) >= PROGRESS_FREQUENCY_SECONDS {
            self.last_printed_at = Instant::now();
            print!(
                "\r{}: {}/{}... {}",
                self.label,
                prettyprint_usize(self.processed_items),
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed_seconds(self.started_at))
            );
            stdout().flush().unwrap();
        }
        None
    }
}

struct TimerSpan {
    name: String,
    started_at: Instant,
    nested_results: Vec<String>,
    nested_time: f64,
}

enum StackEntry {
    TimerSpan(TimerSpan),
    Progress(Progress),
}

/// Hierarchical timing of the named stages of a pipeline run, with progress output for long
/// loops. Dumps a final summary when dropped.
pub struct Timer {
    results: Vec<String>,
    stack: Vec<StackEntry>,

    outermost_name: String,
    notes: Vec<String>,
}

impl Timer {
    pub fn new<S: Into<String>>(raw_name: S) -> Timer {
        let name = raw_name.into();
        let mut t = Timer {
            results: Vec::new(),
            stack: Vec::new(),
            outermost_name: name.clone(),
            notes: Vec::new(),
        };
        t.start(name);
        t
    }

    /// Used for just timing some work, with no final summary.
    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    pub fn start<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        println!("{}...", name);
        self.stack.push(StackEntry::TimerSpan(TimerSpan {
            name,
            started_at: Instant::now(),
            nested_results: Vec::new(),
            nested_time: 0.0,
        }));
    }

    pub fn stop<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        let span = match self.stack.pop() {
            Some(StackEntry::TimerSpan(s)) => s,
            _ => panic!("stop({}) while a Progress is still active", name),
        };
        assert_eq!(span.name, name);
        let elapsed = elapsed_seconds(span.started_at);
        let padding = "  ".repeat(self.stack.len());
        let line = format!("{}- {} took {}", padding, name, prettyprint_time(elapsed));

        let mut lines = vec![line];
        lines.extend(span.nested_results);
        if span.nested_time != 0.0 && elapsed - span.nested_time >= 0.1 {
            lines.push(format!(
                "{}  - unaccounted: {}",
                padding,
                prettyprint_time(elapsed - span.nested_time)
            ));
        }

        match self.stack.last_mut() {
            Some(StackEntry::TimerSpan(ref mut s)) => {
                s.nested_results.extend(lines);
                s.nested_time += elapsed;
            }
            Some(StackEntry::Progress(_)) => panic!("stop({}) while a Progress is active", name),
            None => self.results.extend(lines),
        }
    }

    pub fn start_iter<S: Into<String>>(&mut self, raw_name: S, total_items: usize) {
        if total_items == 0 {
            return;
        }
        self.stack
            .push(StackEntry::Progress(Progress::new(raw_name.into(), total_items)));
    }

    pub fn next(&mut self) {
        let done = match self.stack.last_mut() {
            Some(StackEntry::Progress(ref mut progress)) => progress.next(),
            _ => panic!("next() while no Progress is active"),
        };
        if let Some((elapsed, line)) = done {
            self.stack.pop();
            match self.stack.last_mut() {
                Some(StackEntry::TimerSpan(ref mut s)) => {
                    s.nested_results.push(line);
                    s.nested_time += elapsed;
                }
                _ => self.results.push(line),
            }
        }
    }

    pub fn note(&mut self, line: String) {
        println!("{}", line);
        self.notes.push(line);
    }

    pub fn done(self) {}

    /// Execute the callback over all requests, using all CPUs. The result order matches the
    /// request order, no matter how the workers interleave.
    pub fn parallelize<I, O, F: Fn(I) -> O>(
        &mut self,
        timer_name: &str,
        requests: Vec<I>,
        cb: F,
    ) -> Vec<O>
    where
        I: Send,
        O: Send,
        F: Send + Clone + Copy,
    {
        scoped_threadpool::Pool::new(num_cpus::get() as u32).scoped(|scope| {
            let (tx, rx) = std::sync::mpsc::channel();
            let mut results: Vec<Option<O>> = std::iter::repeat_with(|| None)
                .take(requests.len())
                .collect();
            for (idx, req) in requests.into_iter().enumerate() {
                let tx = tx.clone();
                scope.execute(move || {
                    tx.send((idx, cb(req))).unwrap();
                });
            }
            drop(tx);

            self.start_iter(timer_name, results.len());
            for (idx, result) in rx.iter() {
                self.next();
                results[idx] = Some(result);
            }
            results.into_iter().map(|x| x.unwrap()).collect()
        })
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let stop_name = self.outermost_name.clone();

        // If the timer is being dropped because of a panic, don't double-panic.
        let still_open = match self.stack.last() {
            Some(StackEntry::TimerSpan(span)) => self.stack.len() == 1 && span.name == stop_name,
            _ => false,
        };
        if still_open {
            self.stop(stop_name);
        }

        if self.outermost_name == "throwaway" {
            return;
        }

        println!();
        for line in &self.results {
            println!("{}", line);
        }
        println!();

        if !self.notes.is_empty() {
            println!("{} notes:", self.notes.len());
            for line in &self.notes {
                println!("{}", line);
            }
            println!();
        }
    }
}

pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prettyprint_commas() {
        assert_eq!(prettyprint_usize(432000), "432,000");
        assert_eq!(prettyprint_usize(120), "120");
        assert_eq!(prettyprint_usize(1234567), "1,234,567");
    }

    #[test]
    fn parallelize_preserves_order() {
        let mut timer = Timer::throwaway();
        let results = timer.parallelize("square", (0..100).collect(), |x: usize| x * x);
        assert_eq!(results.len(), 100);
        for (idx, x) in results.into_iter().enumerate() {
            assert_eq!(x, idx * idx);
        }
    }
}
