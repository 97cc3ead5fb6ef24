// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::cosched::{
    collections::mailbox::Mailbox,
    ensure_eq,
    runtime::scheduler::{
        call,
        clear_hooks,
        install_call_hook,
        install_set_state_hook,
    },
    AbsTime,
    ManualClock,
    SchedConfig,
    SchedError,
    Scheduler,
    Step,
    TaskArg,
    TaskHandle,
    TaskInfo,
    TaskRef,
};
use ::std::{
    cell::{
        Cell,
        RefCell,
    },
    rc::Rc,
};

//==============================================================================
// Structures
//==============================================================================

/// Shared record of which tasks ran, in order.
type Journal = Rc<RefCell<Vec<char>>>;

/// Task that appends its tag to a journal and counts its calls.
struct Probe {
    tag: char,
    journal: Journal,
    calls: Cell<usize>,
}

impl Step for Probe {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, _sched: &mut Scheduler, _arg: TaskArg<'_>) {
        self.calls.set(self.calls.get() + 1);
        self.journal.borrow_mut().push(self.tag);
    }
}

//==============================================================================
// Standalone Functions
//==============================================================================

fn do_scheduler() -> Result<(Scheduler, ManualClock)> {
    let clock: ManualClock = ManualClock::new(AbsTime::from_ticks(0));
    let sched: Scheduler = match Scheduler::new(&SchedConfig::default(), clock.clone()) {
        Ok(sched) => sched,
        Err(e) => anyhow::bail!("failed to create scheduler: {:?}", e),
    };
    Ok((sched, clock))
}

fn do_probe(tag: char, journal: &Journal) -> TaskRef<Probe> {
    TaskRef::with_info(
        Probe {
            tag,
            journal: journal.clone(),
            calls: Cell::new(0),
        },
        0,
        TaskInfo::new(tag.to_string()),
    )
}

//==============================================================================
// Ordering
//==============================================================================

/// Tests that ASAP tasks run in the order they were scheduled.
#[test]
fn asap_is_fifo() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let tasks: Vec<TaskRef<Probe>> = "abcde".chars().map(|tag| do_probe(tag, &journal)).collect();

    for task in &tasks {
        task.yield_now(&mut sched, 1)?;
    }
    for _ in 0..tasks.len() {
        sched.step();
    }

    ensure_eq!(journal.borrow().iter().collect::<String>(), "abcde");
    ensure_eq!(sched.is_idle(), true);
    Ok(())
}

/// Tests that interrupt tasks run in the order they were scheduled.
#[test]
fn isr_is_fifo() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let tasks: Vec<TaskRef<Probe>> = "xyz".chars().map(|tag| do_probe(tag, &journal)).collect();

    for task in &tasks {
        task.sched_from_isr(&mut sched)?;
    }
    for _ in 0..tasks.len() {
        sched.step();
    }

    ensure_eq!(journal.borrow().iter().collect::<String>(), "xyz");
    Ok(())
}

/// Tests that one step prefers interrupt tasks, then due deferred tasks, then ASAP tasks, then the idle task.
#[test]
fn precedence() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let asap: TaskRef<Probe> = do_probe('a', &journal);
    let deferred: TaskRef<Probe> = do_probe('d', &journal);
    let isr: TaskRef<Probe> = do_probe('i', &journal);
    let idle: TaskRef<Probe> = do_probe('_', &journal);
    sched.set_idle_task(Some(idle.handle()));

    asap.yield_now(&mut sched, 1)?;
    deferred.defer_for(&mut sched, 1, 0)?;
    isr.sched_from_isr(&mut sched)?;

    for _ in 0..4 {
        sched.step();
    }

    ensure_eq!(journal.borrow().iter().collect::<String>(), "ida_");
    Ok(())
}

/// Tests that an idle scheduler runs the idle task once per step, or nothing without one.
#[test]
fn idle_fallback() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let idle: TaskRef<Probe> = do_probe('_', &journal);

    sched.step();
    ensure_eq!(journal.borrow().len(), 0);

    sched.set_idle_task(Some(idle.handle()));
    for _ in 0..3 {
        sched.step();
    }
    ensure_eq!(idle.calls.get(), 3);

    sched.set_idle_task(None);
    sched.step();
    ensure_eq!(idle.calls.get(), 3);
    Ok(())
}

//==============================================================================
// Time
//==============================================================================

/// Tests that deferred tasks run one per step, in wake time order, once due.
#[test]
fn deferred_time_ordering() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, clock) = do_scheduler()?;
    let t1: TaskRef<Probe> = do_probe('1', &journal);
    let t2: TaskRef<Probe> = do_probe('2', &journal);
    let t3: TaskRef<Probe> = do_probe('3', &journal);
    let idle: TaskRef<Probe> = do_probe('_', &journal);
    sched.set_idle_task(Some(idle.handle()));

    t3.defer_until(&mut sched, 1, AbsTime::from_ticks(14))?;
    t1.defer_until(&mut sched, 1, AbsTime::from_ticks(10))?;
    t2.defer_until(&mut sched, 1, AbsTime::from_ticks(12))?;
    ensure_eq!(sched.next_wake_time(), Some(AbsTime::from_ticks(10)));

    clock.set(AbsTime::from_ticks(8));
    sched.step();
    ensure_eq!(journal.borrow().iter().collect::<String>(), "_");

    clock.set(AbsTime::from_ticks(10));
    sched.step();
    ensure_eq!(journal.borrow().iter().collect::<String>(), "_1");

    clock.set(AbsTime::from_ticks(14));
    sched.step();
    ensure_eq!(journal.borrow().iter().collect::<String>(), "_12");
    sched.step();
    ensure_eq!(journal.borrow().iter().collect::<String>(), "_123");
    sched.step();
    ensure_eq!(journal.borrow().iter().collect::<String>(), "_123_");
    Ok(())
}

/// Tests the idle / A / B scenario with a stepped test clock.
#[test]
fn idle_and_two_deferred_tasks() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, clock) = do_scheduler()?;
    let idle: TaskRef<Probe> = do_probe('I', &journal);
    let a: TaskRef<Probe> = do_probe('A', &journal);
    let b: TaskRef<Probe> = do_probe('B', &journal);
    sched.set_idle_task(Some(idle.handle()));

    sched.defer_until(&a.handle(), AbsTime::from_ticks(10))?;
    sched.defer_until(&b.handle(), AbsTime::from_ticks(12))?;

    clock.set(AbsTime::from_ticks(8));
    sched.step();
    ensure_eq!((idle.calls.get(), a.calls.get(), b.calls.get()), (1, 0, 0));

    clock.set(AbsTime::from_ticks(10));
    sched.step();
    ensure_eq!((idle.calls.get(), a.calls.get(), b.calls.get()), (1, 1, 0));

    clock.set(AbsTime::from_ticks(12));
    sched.step();
    ensure_eq!((idle.calls.get(), a.calls.get(), b.calls.get()), (1, 1, 1));
    Ok(())
}

/// Tests that tasks due at the same time run first-scheduled-first.
#[test]
fn deferred_ties() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, clock) = do_scheduler()?;
    let tasks: Vec<TaskRef<Probe>> = "pqrs".chars().map(|tag| do_probe(tag, &journal)).collect();

    for task in &tasks {
        task.defer_for(&mut sched, 1, 5)?;
    }
    clock.advance(5);
    for _ in 0..tasks.len() {
        sched.step();
    }

    ensure_eq!(journal.borrow().iter().collect::<String>(), "pqrs");
    Ok(())
}

/// Tests that a cancelled deferral never runs and cannot be cancelled twice.
#[test]
fn cancellation() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, clock) = do_scheduler()?;
    let watchdog: TaskRef<Probe> = do_probe('w', &journal);

    watchdog.defer_for(&mut sched, 1, 3)?;
    ensure_eq!(sched.remove_deferred_task(&watchdog.handle()), Ok(()));
    ensure_eq!(sched.remove_deferred_task(&watchdog.handle()), Err(SchedError::NotFound));

    clock.advance(10);
    sched.step();
    ensure_eq!(watchdog.calls.get(), 0);
    Ok(())
}

//==============================================================================
// Hooks
//==============================================================================

/// Tests that the call hook fires once per task call and never for an absent task.
#[test]
fn call_hook() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let a: TaskRef<Probe> = do_probe('a', &journal);
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let hook_seen: Rc<RefCell<Vec<String>>> = seen.clone();
    install_call_hook(move |task: &TaskHandle| hook_seen.borrow_mut().push(task.name().unwrap_or("?").to_string()));

    a.yield_now(&mut sched, 1)?;
    sched.step();
    call(None, &mut sched, None);
    a.call(&mut sched, None);
    clear_hooks();
    a.call(&mut sched, None);

    ensure_eq!(*seen.borrow(), vec!["a".to_string(), "a".to_string()]);
    ensure_eq!(a.calls.get(), 3);
    Ok(())
}

/// Tests that the state-change hook fires only on actual changes.
#[test]
fn set_state_hook() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, _clock) = do_scheduler()?;
    let a: TaskRef<Probe> = do_probe('a', &journal);
    let fired: Rc<Cell<usize>> = Rc::new(Cell::new(0));
    let hook_fired: Rc<Cell<usize>> = fired.clone();
    install_set_state_hook(move |_, _, _| hook_fired.set(hook_fired.get() + 1));

    a.set_state(5);
    a.set_state(5);
    a.yield_now(&mut sched, 5)?;
    a.wait(6);
    clear_hooks();

    ensure_eq!(fired.get(), 2);
    Ok(())
}

//==============================================================================
// Mailbox
//==============================================================================

/// Consumer that drains a mailbox each time it is called.
struct Consumer {
    mailbox: Rc<RefCell<Option<Rc<Mailbox<u32>>>>>,
    received: RefCell<Vec<u32>>,
}

impl Step for Consumer {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        let mailbox: Option<Rc<Mailbox<u32>>> = self.mailbox.borrow().clone();
        if let Some(mailbox) = mailbox {
            while let Some(item) = mailbox.get(sched) {
                self.received.borrow_mut().push(item);
            }
        }
    }
}

/// Tests that a consumer notified on put receives every item as soon as it is posted.
#[test]
fn mailbox_wakes_consumer() -> Result<()> {
    let (mut sched, _clock) = do_scheduler()?;
    let slot: Rc<RefCell<Option<Rc<Mailbox<u32>>>>> = Rc::new(RefCell::new(None));
    let consumer: TaskRef<Consumer> = TaskRef::new(
        Consumer {
            mailbox: slot.clone(),
            received: RefCell::new(Vec::new()),
        },
        0,
    );
    let mailbox: Rc<Mailbox<u32>> = Rc::new(Mailbox::with_callbacks(2, Some(consumer.handle()), None));
    *slot.borrow_mut() = Some(mailbox.clone());

    for i in 0..10 {
        ensure_eq!(mailbox.put(&mut sched, i), true);
        ensure_eq!(mailbox.is_empty(), true);
    }

    ensure_eq!(*consumer.received.borrow(), (0..10).collect::<Vec<u32>>());
    *slot.borrow_mut() = None;
    Ok(())
}

//==============================================================================
// State machines
//==============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Blink {
    Off,
    On,
    Done,
}

/// Toggles a fixed number of times, one toggle per tick, then hands control to a continuation.
struct Blinker {
    toggles: Cell<u32>,
    continuation: TaskHandle,
}

impl Step for Blinker {
    type State = Blink;

    fn step(&self, task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        if self.toggles.get() == 0 {
            if let Err(e) = task.transfer(sched, Blink::Done, &self.continuation) {
                panic!("transfer failed: {:?}", e);
            }
            return;
        }
        self.toggles.set(self.toggles.get() - 1);
        let next: Blink = match task.state() {
            Blink::Off => Blink::On,
            _ => Blink::Off,
        };
        if let Err(e) = task.defer_for(sched, next, 1) {
            panic!("defer failed: {:?}", e);
        }
    }
}

/// Tests a multi-step task driven by the scheduler until it hands over to its continuation.
#[test]
fn blinker_hands_over() -> Result<()> {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let (mut sched, clock) = do_scheduler()?;
    let done: TaskRef<Probe> = do_probe('!', &journal);
    let blinker: TaskRef<Blinker> = TaskRef::new(
        Blinker {
            toggles: Cell::new(4),
            continuation: done.handle(),
        },
        Blink::Off,
    );

    blinker.yield_now(&mut sched, Blink::Off)?;
    let mut ticks: u32 = 0;
    while done.calls.get() == 0 && ticks < 100 {
        sched.step();
        clock.advance(1);
        ticks += 1;
    }

    ensure_eq!(blinker.state(), Blink::Done);
    ensure_eq!(done.calls.get(), 1);
    ensure_eq!(sched.is_idle(), true);
    Ok(())
}
