//! Two interchangeable storage slots with a front/back role.

/// Which physical slot currently plays the front role.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// A pair of buffers where one is read (front) and the other written
/// (back). [`swap`](PingPong::swap) flips the roles without moving data.
#[derive(Debug)]
pub struct PingPong<T> {
    a: T,
    b: T,
    front: Slot,
}

impl<T> PingPong<T> {
    /// `a` starts in front.
    pub fn new(a: T, b: T) -> Self {
        Self {
            a,
            b,
            front: Slot::A,
        }
    }

    pub fn front_slot(&self) -> Slot {
        self.front
    }

    pub fn front(&self) -> &T {
        self.get(self.front)
    }

    pub fn back(&self) -> &T {
        self.get(self.front.other())
    }

    pub fn front_mut(&mut self) -> &mut T {
        match self.front {
            Slot::A => &mut self.a,
            Slot::B => &mut self.b,
        }
    }

    pub fn back_mut(&mut self) -> &mut T {
        match self.front {
            Slot::A => &mut self.b,
            Slot::B => &mut self.a,
        }
    }

    /// `(front, back)`.
    pub fn split(&self) -> (&T, &T) {
        (self.front(), self.back())
    }

    /// `(front, back)`, both mutable.
    pub fn split_mut(&mut self) -> (&mut T, &mut T) {
        match self.front {
            Slot::A => (&mut self.a, &mut self.b),
            Slot::B => (&mut self.b, &mut self.a),
        }
    }

    pub fn swap(&mut self) {
        self.front = self.front.other();
    }

    /// Put slot A back in front.
    pub fn reset(&mut self) {
        self.front = Slot::A;
    }

    pub fn into_front(self) -> T {
        match self.front {
            Slot::A => self.a,
            Slot::B => self.b,
        }
    }

    fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }
}
