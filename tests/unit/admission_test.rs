//! Tests for the put/get admission scaffold with a level-based container.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ops::Deref;
use std::rc::Rc;

use prometheus_des::core::{Environment, Event, SimResult, Until, Value};
use prometheus_des::resources::Admission;

#[derive(Clone, PartialEq)]
struct Transfer {
    event: Event,
    amount: f64,
}

impl Deref for Transfer {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

struct Tank {
    env: Environment,
    capacity: f64,
    level: Cell<f64>,
    puts: RefCell<VecDeque<Transfer>>,
    gets: RefCell<VecDeque<Transfer>>,
}

impl Tank {
    fn new(env: &Environment, capacity: f64) -> Rc<Self> {
        Rc::new(Self {
            env: env.clone(),
            capacity,
            level: Cell::new(0.0),
            puts: RefCell::new(VecDeque::new()),
            gets: RefCell::new(VecDeque::new()),
        })
    }

    fn put(self: &Rc<Self>, amount: f64) -> SimResult<Transfer> {
        let transfer = Transfer { event: self.env.event(), amount };
        self.puts.borrow_mut().push_back(transfer.clone());
        let weak = Rc::downgrade(self);
        transfer.on_processed(move |_, _| {
            if let Some(tank) = weak.upgrade() {
                tank.trigger_get().unwrap();
            }
        })?;
        self.trigger_put()?;
        Ok(transfer)
    }

    fn get(self: &Rc<Self>, amount: f64) -> SimResult<Transfer> {
        let transfer = Transfer { event: self.env.event(), amount };
        self.gets.borrow_mut().push_back(transfer.clone());
        let weak = Rc::downgrade(self);
        transfer.on_processed(move |_, _| {
            if let Some(tank) = weak.upgrade() {
                tank.trigger_put().unwrap();
            }
        })?;
        self.trigger_get()?;
        Ok(transfer)
    }
}

impl Admission for Tank {
    type Put = Transfer;
    type Get = Transfer;

    fn next_put(&self) -> Option<Transfer> {
        self.puts.borrow().front().cloned()
    }

    fn remove_put(&self, put: &Transfer) -> SimResult<()> {
        self.puts.borrow_mut().retain(|p| p != put);
        Ok(())
    }

    fn next_get(&self) -> Option<Transfer> {
        self.gets.borrow().front().cloned()
    }

    fn remove_get(&self, get: &Transfer) -> SimResult<()> {
        self.gets.borrow_mut().retain(|g| g != get);
        Ok(())
    }

    fn do_put(&self, put: &Transfer) -> SimResult<bool> {
        if self.level.get() + put.amount <= self.capacity {
            self.level.set(self.level.get() + put.amount);
            put.succeed(Value::none())?;
            return Ok(true);
        }
        Ok(false)
    }

    fn do_get(&self, get: &Transfer) -> SimResult<bool> {
        if self.level.get() >= get.amount {
            self.level.set(self.level.get() - get.amount);
            get.succeed(Value::new(get.amount))?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[test]
fn test_get_waits_for_enough_level() {
    let env = Environment::new();
    let tank = Tank::new(&env, 10.0);

    let get = tank.get(5.0).unwrap();
    assert!(!get.is_triggered());
    tank.put(3.0).unwrap();
    tank.put(4.0).unwrap();
    assert_eq!(tank.level.get(), 7.0);

    env.run(Until::Forever).unwrap();
    assert_eq!(get.value().and_then(|v| v.get::<f64>().copied()), Some(5.0));
    assert_eq!(tank.level.get(), 2.0);
}

#[test]
fn test_put_blocks_at_capacity_and_resumes() {
    let env = Environment::new();
    let tank = Tank::new(&env, 4.0);

    tank.put(3.0).unwrap();
    let blocked = tank.put(3.0).unwrap();
    let behind = tank.put(1.0).unwrap();
    assert!(!blocked.is_triggered());
    assert!(!behind.is_triggered(), "head of line blocks later puts");

    tank.get(3.0).unwrap();
    env.run(Until::Forever).unwrap();
    assert!(blocked.is_processed());
    assert!(behind.is_processed());
    assert_eq!(tank.level.get(), 4.0);
}
