// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::cosched::{
    ensure_eq,
    IsrHandle,
    SchedConfig,
    SchedError,
    Scheduler,
    Step,
    SystemClock,
    TaskArg,
    TaskId,
    TaskRef,
};
use ::std::{
    cell::RefCell,
    hint,
    rc::Rc,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    thread,
};

//==============================================================================
// Constants
//==============================================================================

/// Number of events raised by the simulated interrupt source.
const NUM_EVENTS: usize = 10_000;

//==============================================================================
// Structures
//==============================================================================

/// Records which sensor raised each event.
struct Sensor {
    index: usize,
    events: Rc<RefCell<Vec<usize>>>,
}

impl Step for Sensor {
    type State = u8;

    fn step(&self, _task: &TaskRef<Self>, _sched: &mut Scheduler, _arg: TaskArg<'_>) {
        self.events.borrow_mut().push(self.index);
    }
}

//==============================================================================
// Tests
//==============================================================================

/// Tests that events raised from another thread all reach the scheduler, in order.
#[test]
fn events_from_another_thread() -> Result<()> {
    let config: SchedConfig = SchedConfig {
        max_isr_tasks: 16,
        ..Default::default()
    };
    let mut sched: Scheduler = match Scheduler::new(&config, SystemClock::default()) {
        Ok(sched) => sched,
        Err(e) => anyhow::bail!("failed to create scheduler: {:?}", e),
    };
    let events: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::with_capacity(NUM_EVENTS)));
    let sensors: Vec<TaskRef<Sensor>> = (0..3)
        .map(|index| {
            TaskRef::new(
                Sensor {
                    index,
                    events: events.clone(),
                },
                0,
            )
        })
        .collect();
    let mut ids: Vec<TaskId> = Vec::with_capacity(sensors.len());
    for sensor in &sensors {
        ids.push(sched.register(&sensor.handle())?);
    }

    let isr: IsrHandle = sched.isr_handle();
    let done: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let producer_done: Arc<AtomicBool> = done.clone();
    let producer: thread::JoinHandle<usize> = thread::spawn(move || {
        let mut retries: usize = 0;
        for i in 0..NUM_EVENTS {
            while isr.schedule(ids[i % ids.len()]) == Err(SchedError::SchedFull) {
                retries += 1;
                hint::spin_loop();
            }
        }
        producer_done.store(true, Ordering::Release);
        retries
    });

    while !(done.load(Ordering::Acquire) && sched.is_idle()) {
        sched.step();
    }
    if producer.join().is_err() {
        anyhow::bail!("producer thread panicked");
    }

    let events = events.borrow();
    ensure_eq!(events.len(), NUM_EVENTS);
    for (i, index) in events.iter().enumerate() {
        ensure_eq!(*index, i % sensors.len());
    }
    Ok(())
}

/// Tests that interrupt tasks are served ahead of pending ASAP work.
#[test]
fn isr_preempts_asap_queue() -> Result<()> {
    let mut sched: Scheduler = match Scheduler::new(&SchedConfig::default(), SystemClock::default()) {
        Ok(sched) => sched,
        Err(e) => anyhow::bail!("failed to create scheduler: {:?}", e),
    };
    let events: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let background: TaskRef<Sensor> = TaskRef::new(
        Sensor {
            index: 0,
            events: events.clone(),
        },
        0,
    );
    let urgent: TaskRef<Sensor> = TaskRef::new(
        Sensor {
            index: 1,
            events: events.clone(),
        },
        0,
    );
    let id: TaskId = sched.register(&urgent.handle())?;

    background.yield_now(&mut sched, 0)?;
    background.yield_now(&mut sched, 0)?;
    sched.step();

    let isr: IsrHandle = sched.isr_handle();
    thread::spawn(move || isr.schedule(id))
        .join()
        .map_err(|_| anyhow::anyhow!("interrupt thread panicked"))??;
    sched.step();
    sched.step();

    ensure_eq!(*events.borrow(), vec![0, 1, 0]);
    Ok(())
}
