// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::clap::{
    Arg,
    ArgMatches,
    Command,
};
use ::cosched::{
    collections::mailbox::Mailbox,
    runtime::{
        logging,
        time::{
            ms_to_rel,
            rel_to_ms,
        },
        timer::Timer,
        trace,
    },
    AbsTime,
    IsrHandle,
    RelTime,
    SchedConfig,
    Scheduler,
    Step,
    SystemClock,
    TaskArg,
    TaskHandle,
    TaskId,
    TaskInfo,
    TaskRef,
};
use ::std::{
    cell::{
        Cell,
        RefCell,
    },
    rc::Rc,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    thread,
    time::Duration,
};

//==============================================================================
// Program Arguments
//==============================================================================

/// Program Arguments
#[derive(Debug)]
pub struct ProgramArguments {
    /// Configuration file.
    config: Option<String>,
    /// Number of LED toggles before stopping.
    blinks: u32,
    /// LED toggle period, in milliseconds.
    period_ms: u64,
    /// Interval between simulated button presses, in milliseconds.
    press_ms: u64,
}

/// Associate functions for Program Arguments
impl ProgramArguments {
    /// Default number of toggles.
    const DEFAULT_BLINKS: u32 = 10;
    /// Default toggle period.
    const DEFAULT_PERIOD_MS: u64 = 250;
    /// Default interval between button presses.
    const DEFAULT_PRESS_MS: u64 = 400;

    /// Parses the program arguments from the command line interface.
    pub fn new(app_name: &'static str, app_author: &'static str, app_about: &'static str) -> Result<Self> {
        let matches: ArgMatches = Command::new(app_name)
            .author(app_author)
            .about(app_about)
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("PATH")
                    .help("Sets scheduler configuration file"),
            )
            .arg(
                Arg::new("blinks")
                    .long("blinks")
                    .value_parser(clap::value_parser!(u32))
                    .required(false)
                    .value_name("COUNT")
                    .help("Sets number of LED toggles"),
            )
            .arg(
                Arg::new("period")
                    .long("period")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("MILLISECONDS")
                    .help("Sets LED toggle period"),
            )
            .arg(
                Arg::new("press")
                    .long("press")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("MILLISECONDS")
                    .help("Sets interval between simulated button presses"),
            )
            .get_matches();

        Ok(Self {
            config: matches.get_one::<String>("config").cloned(),
            blinks: matches.get_one::<u32>("blinks").copied().unwrap_or(Self::DEFAULT_BLINKS),
            period_ms: matches.get_one::<u64>("period").copied().unwrap_or(Self::DEFAULT_PERIOD_MS),
            press_ms: matches.get_one::<u64>("press").copied().unwrap_or(Self::DEFAULT_PRESS_MS),
        })
    }
}

//==============================================================================
// Tasks
//==============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LedState {
    Off,
    On,
    Done,
}

/// Toggles the LED every time its timer fires, and hands over to `on_done` after the last toggle.
struct Led {
    timer: Timer,
    remaining: Cell<u32>,
    on_done: TaskHandle,
}

impl Step for Led {
    type State = LedState;

    fn step(&self, task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        if self.remaining.get() == 0 {
            self.timer.stop(sched);
            if let Err(e) = task.transfer(sched, LedState::Done, &self.on_done) {
                error!("led: cannot hand over ({:?})", e);
            }
            return;
        }
        self.remaining.set(self.remaining.get() - 1);
        let next: LedState = match task.state() {
            LedState::On => LedState::Off,
            _ => LedState::On,
        };
        task.wait(next);
        info!("led: {:?} at t={:?}", next, sched.current_time());
    }
}

/// Runs from the interrupt hand-off queue and posts the press count to a mailbox.
struct Button {
    presses: Cell<u32>,
    mailbox: Rc<Mailbox<u32>>,
}

impl Step for Button {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        self.presses.set(self.presses.get() + 1);
        if !self.mailbox.put(sched, self.presses.get()) {
            warn!("button: mailbox is full, dropping press {:?}", self.presses.get());
        }
    }
}

/// Drains the mailbox whenever something is posted to it.
struct Reporter {
    mailbox: RefCell<Option<Rc<Mailbox<u32>>>>,
}

impl Step for Reporter {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        let mailbox: Option<Rc<Mailbox<u32>>> = self.mailbox.borrow().clone();
        if let Some(mailbox) = mailbox {
            while let Some(press) = mailbox.get(sched) {
                info!("button: press #{:?}", press);
            }
        }
    }
}

/// Raises the exit flag.
struct Finish {
    done: Cell<bool>,
}

impl Step for Finish {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, _sched: &mut Scheduler, _arg: TaskArg<'_>) {
        self.done.set(true);
    }
}

//==============================================================================
// Application
//==============================================================================

/// Application
struct Application {
    sched: Scheduler,
    led: TaskRef<Led>,
    finish: TaskRef<Finish>,
    button: TaskId,
    period: RelTime,
    press_interval: Duration,
    ticks_per_second: u32,
}

/// Associated Functions for the Application
impl Application {
    /// Capacity of the button mailbox.
    const MAILBOX_CAPACITY: usize = 4;
    /// Longest nap of the super-loop when nothing is pending, in milliseconds.
    const MAX_NAP_MS: i64 = 10;

    /// Instantiates the application.
    pub fn new(args: &ProgramArguments) -> Result<Self> {
        let config: SchedConfig = match &args.config {
            Some(path) => SchedConfig::from_file(path)?,
            None => SchedConfig::default(),
        };
        let mut sched: Scheduler = Scheduler::new(&config, SystemClock::new(config.ticks_per_second))?;

        let finish: TaskRef<Finish> =
            TaskRef::with_info(Finish { done: Cell::new(false) }, 0, TaskInfo::new("finish"));
        let led: TaskRef<Led> = TaskRef::with_info(
            Led {
                timer: Timer::with_name("led-timer"),
                remaining: Cell::new(args.blinks),
                on_done: finish.handle(),
            },
            LedState::Off,
            TaskInfo::new("led"),
        );

        let reporter: TaskRef<Reporter> = TaskRef::with_info(
            Reporter {
                mailbox: RefCell::new(None),
            },
            0,
            TaskInfo::new("reporter"),
        );
        let mailbox: Rc<Mailbox<u32>> =
            Rc::new(Mailbox::with_callbacks(Self::MAILBOX_CAPACITY, Some(reporter.handle()), None));
        *reporter.mailbox.borrow_mut() = Some(mailbox.clone());
        let button: TaskRef<Button> = TaskRef::with_info(
            Button {
                presses: Cell::new(0),
                mailbox,
            },
            0,
            TaskInfo::new("button"),
        );
        let button: TaskId = sched.register(&button.handle())?;

        Ok(Self {
            sched,
            led,
            finish,
            button,
            period: ms_to_rel(args.period_ms as i64, config.ticks_per_second),
            press_interval: Duration::from_millis(args.press_ms),
            ticks_per_second: config.ticks_per_second,
        })
    }

    /// Runs the super-loop until the LED is done blinking.
    pub fn run(&mut self) -> Result<()> {
        self.led.timer.start(&mut self.sched, self.period, true, Some(self.led.handle()))?;

        // Simulated interrupt source.
        let isr: IsrHandle = self.sched.isr_handle();
        let button: TaskId = self.button;
        let press_interval: Duration = self.press_interval;
        let stop: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
        let stop_isr: Arc<AtomicBool> = stop.clone();
        let irq: thread::JoinHandle<()> = thread::spawn(move || {
            while !stop_isr.load(Ordering::Acquire) {
                thread::sleep(press_interval);
                if isr.schedule(button).is_err() {
                    warn!("irq: interrupt queue is full");
                }
            }
        });

        while !self.finish.done.get() {
            self.sched.step();
            if self.sched.asap_count() == 0 {
                self.nap();
            }
        }

        stop.store(true, Ordering::Release);
        if irq.join().is_err() {
            anyhow::bail!("interrupt thread panicked");
        }
        info!("done at t={:?}", self.sched.current_time());
        Ok(())
    }

    /// Sleeps until the next deferred task is due, or a short while if none is.
    fn nap(&self) {
        let now: AbsTime = self.sched.current_time();
        let ms: i64 = match self.sched.next_wake_time() {
            Some(at) if at.follows(now) => rel_to_ms(at.difference(now), self.ticks_per_second),
            Some(_) => return,
            None => Self::MAX_NAP_MS,
        };
        thread::sleep(Duration::from_millis(ms.clamp(0, Self::MAX_NAP_MS) as u64));
    }
}

//==============================================================================
// main()
//==============================================================================

fn main() -> Result<()> {
    logging::initialize();

    let args: ProgramArguments = ProgramArguments::new(
        "blinky",
        "Microsoft Corporation",
        "Blinks a simulated LED from a cooperative scheduler.",
    )?;

    let mut app: Application = Application::new(&args)?;
    trace::install(None);
    let result: Result<()> = app.run();
    trace::uninstall();
    result
}
