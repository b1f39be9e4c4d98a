use std::{
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use log::{debug, info};
use rand::Rng;

use super::{sequence::SharedSequence, Version, LETTERS_PER_CALL};
use crate::Result;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerDelays {
    /// Pause between filling the shared sequence and reading it back in v3.
    pub v3: Duration,
    /// Pause between filling the local sequence and reading it back in v4.
    pub v4: Duration,
}

impl Default for ControllerDelays {
    fn default() -> Self {
        Self {
            v3: Duration::from_millis(50),
            v4: Duration::from_millis(500),
        }
    }
}

/// The one object that serves every request.
///
/// The server builds exactly one of these and hands an `Arc` of it to every
/// worker, so `shared_list` is visible to all concurrent requests at once.
/// Versions 1 to 3 keep their letters in that field and get trampled by each
/// other under load. Version 4 keeps its letters in a local `Vec` that lives
/// on the calling thread's stack frame and is always correct.
pub struct StressTestController {
    instance_id: u64,
    delays: ControllerDelays,
    //  how the v3 and v4 delays are spent
    pause: fn(Duration),
    shared_list: SharedSequence,
}

impl StressTestController {
    pub fn new(delays: ControllerDelays) -> Self {
        Self::with_pause(delays, thread::sleep)
    }

    fn with_pause(delays: ControllerDelays, pause: fn(Duration)) -> Self {
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        info!("One StressTestController has been created! (instance {instance_id})");
        Self {
            instance_id,
            delays,
            pause,
            shared_list: SharedSequence::new(),
        }
    }

    /// Stable for the lifetime of this controller and unique within the process.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn handle(&self, version: Version) -> Result<String> {
        debug!("instance {} handling {version}", self.instance_id);
        match version {
            Version::V1 => self.version1(),
            Version::V2 => self.version2(),
            Version::V3 => self.version3(),
            Version::V4 => self.version4(),
        }
    }

    /// Never clears, so every call returns ten more letters than the last.
    pub fn version1(&self) -> Result<String> {
        let letter = random_letter();
        fill_shared(&self.shared_list, &letter);
        let return_value = self.shared_list.join()?;
        Ok(self.report(return_value))
    }

    pub fn version2(&self) -> Result<String> {
        self.refill_shared(&random_letter(), None)
    }

    pub fn version3(&self) -> Result<String> {
        self.refill_shared(&random_letter(), Some(self.delays.v3))
    }

    pub fn version4(&self) -> Result<String> {
        let mut non_shared_list = Vec::with_capacity(LETTERS_PER_CALL);
        let letter = random_letter();
        for _ in 0..LETTERS_PER_CALL {
            non_shared_list.push(letter.clone());
        }
        (self.pause)(self.delays.v4);
        let return_value = non_shared_list.concat();
        Ok(self.report(return_value))
    }

    /// Clear, fill with `letter`, optionally wait, then read back. Shared by v2 and v3.
    fn refill_shared(&self, letter: &str, delay: Option<Duration>) -> Result<String> {
        self.shared_list.clear();
        fill_shared(&self.shared_list, letter);
        if let Some(delay) = delay {
            (self.pause)(delay);
        }
        let return_value = self.shared_list.join()?;
        Ok(self.report(return_value))
    }

    fn report(&self, return_value: String) -> String {
        info!("{}: {}", self.instance_id, return_value);
        return_value
    }
}

fn fill_shared(list: &SharedSequence, letter: &str) {
    for _ in 0..LETTERS_PER_CALL {
        list.push(letter);
    }
}

/// Picks one of `A` through `Z` uniformly.
pub fn random_letter() -> String {
    let code = rand::thread_rng().gen_range(b'A'..=b'Z');
    convert_to_letter(code)
}

pub fn convert_to_letter(code: u8) -> String {
    char::from(code).to_string()
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::VecDeque,
        rc::Rc,
        sync::{Arc, Barrier},
    };

    use super::*;
    use crate::stress::is_well_formed;

    type Arrival = Box<dyn FnOnce()>;

    thread_local! {
        //  callers waiting to show up while an earlier caller is paused
        static ARRIVALS: RefCell<VecDeque<Arrival>> = RefCell::new(VecDeque::new());
        //  (own letter, what that caller got back)
        static OUTCOMES: RefCell<Vec<(String, Result<String>)>> = RefCell::new(Vec::new());
    }

    /// Instead of sleeping, lets the next queued caller run to completion.
    fn admit_next_arrival(_: Duration) {
        let next = ARRIVALS.with(|arrivals| arrivals.borrow_mut().pop_front());
        if let Some(arrival) = next {
            arrival();
        }
    }

    fn quick_controller() -> StressTestController {
        StressTestController::new(ControllerDelays {
            v3: Duration::from_millis(50),
            v4: Duration::from_millis(20),
        })
    }

    /// Runs one caller per letter on this thread. Each caller after the first
    /// arrives while the caller before it is paused, if that caller pauses at all.
    fn overlapping_callers(version: Version, letters: &[&str]) -> Vec<(String, Result<String>)> {
        let controller = Rc::new(StressTestController::with_pause(
            ControllerDelays::default(),
            admit_next_arrival,
        ));
        let call = |letter: String| {
            let controller = Rc::clone(&controller);
            move || {
                let outcome = match version {
                    Version::V2 => controller.refill_shared(&letter, None),
                    Version::V3 => controller.refill_shared(&letter, Some(controller.delays.v3)),
                    other => panic!("{other} does not use the shared list this way"),
                };
                OUTCOMES.with(|outcomes| outcomes.borrow_mut().push((letter, outcome)));
            }
        };
        ARRIVALS.with(|arrivals| {
            let mut arrivals = arrivals.borrow_mut();
            for letter in &letters[1..] {
                arrivals.push_back(Box::new(call(letter.to_string())));
            }
        });

        call(letters[0].to_string())();
        //  callers nobody was paused long enough to overlap with arrive afterwards
        while let Some(arrival) = ARRIVALS.with(|arrivals| arrivals.borrow_mut().pop_front()) {
            arrival();
        }
        OUTCOMES.with(|outcomes| outcomes.borrow_mut().drain(..).collect())
    }

    fn got_someone_elses_letters(own: &str, outcome: &Result<String>) -> bool {
        match outcome {
            Ok(body) => !(is_well_formed(body) && body.starts_with(own)),
            Err(_) => true,
        }
    }

    const TEN_CALLERS: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

    #[test]
    fn letters_are_uppercase() {
        assert_eq!(convert_to_letter(65), "A");
        assert_eq!(convert_to_letter(90), "Z");
        for _ in 0..500 {
            let letter = random_letter();
            assert_eq!(letter.len(), 1);
            assert!(letter.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn version1_grows_by_ten_every_call() {
        let controller = quick_controller();
        let mut previous = String::new();
        for call in 1..=5 {
            let body = controller.version1().unwrap();
            assert_eq!(body.len(), call * LETTERS_PER_CALL);
            assert!(body.starts_with(&previous));
            assert!(is_well_formed(&body[previous.len()..]));
            previous = body;
        }
    }

    #[test]
    fn serialized_calls_are_well_formed() {
        let controller = quick_controller();
        for version in Version::ALL.into_iter().filter(|v| *v != Version::V1) {
            for _ in 0..5 {
                let body = controller.handle(version).unwrap();
                assert!(is_well_formed(&body), "{version} returned {body:?}");
            }
        }
    }

    #[test]
    fn version4_survives_concurrency() {
        let controller = Arc::new(quick_controller());
        let barrier = Arc::new(Barrier::new(32));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    controller.version4()
                })
            })
            .collect();
        for handle in handles {
            let body = handle.join().unwrap().unwrap();
            assert!(is_well_formed(&body), "v4 returned {body:?}");
        }
    }

    #[test]
    fn version3_caller_reads_back_a_later_callers_letters() {
        let outcomes = overlapping_callers(Version::V3, &["A", "B"]);
        //  B arrived during A's pause and finished first
        assert_eq!(outcomes[0].0, "B");
        assert_eq!(outcomes[0].1.as_ref().unwrap(), "BBBBBBBBBB");
        assert_eq!(outcomes[1].0, "A");
        assert_eq!(outcomes[1].1.as_ref().unwrap(), "BBBBBBBBBB");
        assert!(got_someone_elses_letters("A", &outcomes[1].1));
    }

    #[test]
    fn version3_delay_breaks_callers_that_version2_serves_correctly() {
        let broken = |version| {
            overlapping_callers(version, &TEN_CALLERS)
                .iter()
                .filter(|(own, outcome)| got_someone_elses_letters(own, outcome))
                .count()
        };
        let v2 = broken(Version::V2);
        let v3 = broken(Version::V3);
        assert_eq!(v2, 0);
        //  everyone but the last arrival reads the last arrival's letters
        assert_eq!(v3, TEN_CALLERS.len() - 1);
        assert!(v3 > v2);
    }

    #[test]
    fn instance_id_is_stable_and_unique() {
        let controller = quick_controller();
        let first = controller.instance_id();
        controller.version2().unwrap();
        assert_eq!(controller.instance_id(), first);

        let other = quick_controller();
        assert_ne!(other.instance_id(), first);
    }
}
