use crate::{reporter::CollectingReporter, Lox, Outcome};
use std::{cell::RefCell, io::Write, rc::Rc};

pub const EXPRESSION_TEST: &str = r#"
    "foo" + (1 + (3 / 2) - (8 * 4))
"#;

pub const VARIABLE_TEST: &str = r#"
    var i = 5;
    var foo = "bar";
    var is_okay = true;
"#;

pub const PRINT_TEST: &str = r#"
    var pi = 3.14;
    print pi;
    var foo;
    print foo;
"#;

pub const BLOCK_SCOPE_TEST: &str = r#"
    var foo = "foo";
    {
        var foo = "bar";
        print foo;
    }
"#;

pub const CONTROL_FLOW_TEST: &str = r#"
    if (true and (nil or "truthy")) {
        print "true";
    } else {
        print "false";
    }
    if (false) {
        print "false";
    } else {
        print "true";
    }
"#;

pub const WHILE_LOOP_TEST: &str = r#"
    var index = 4;
    while (index > 0) {
        print index;
        index = index - 1;
    }
"#;

pub const FOR_LOOP_TEST: &str = r#"
    var index = 42;
    for (var index = 0; index < 4; index = index + 1) {
        print index;
    }
    print index;
"#;

pub const FUNCTION_TEST: &str = r#"
    fun greet(name) {
        fun greeting() {
            return "Hello, " + name + "!";
        }
        print greeting();
    }
    fun get_name() {
        return "world";
    }
    greet(get_name());
"#;

pub const FUNCTION_CLOSURE_TEST: &str = r#"
    fun make_counter() {
        var i = 0;
        fun count() {
            i = i + 1;
            print i;
        }

        return count;
    }

    var counter = make_counter();
    counter();
    counter();
"#;

pub const SHADOWING_TEST: &str = r#"
    var a = "global";
    {
        fun print_a() {
            print a;
        }

        print_a();
        var a = "block";
        print_a();
    }
"#;

pub const CLASS_TEST: &str = r#"
    class Greeter {
        init(greeting) {
            this.greeting = greeting;
        }

        greet(name) {
            print this.greeting + ", " + name + "!";
        }

        make_greet(name) {
            fun greet() {
                print this.greeting + ", " + name + "!";
            }
            return greet;
        }
    }
    var greeter = Greeter("Hello");
    greeter.greet("world");
    var greet = greeter.make_greet("friends");
    greet();
"#;

pub const CLASS_INHERITANCE_TEST: &str = r#"
    class Greeter {
        init(greeting) {
            this.greeting = greeting;
        }

        greet(name) {
            print this.greeting + ", " + name;
        }
    }

    class HelloGreeter < Greeter {
        init() {
            super.init("Hello");
        }
    }

    class HowdyGreeter < Greeter {
        init() {
            super.init("Howdy");
        }
    }

    var hello = HelloGreeter();
    var howdy = HowdyGreeter();
    hello.greet("world");
    howdy.greet("partner");
"#;

/// Output sink that tests can read back after handing a clone to the
/// interpreter.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.borrow())
            .lines()
            .map(|line| line.to_string())
            .collect()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct TestRun {
    pub outcome: Outcome,
    pub output: Vec<String>,
    pub reporter: CollectingReporter,
}

/// Run a program on a fresh interpreter, capturing printed lines and
/// diagnostics.
pub fn run(source: &str) -> TestRun {
    let output = SharedOutput::default();
    let mut lox = Lox::new(Box::new(output.clone()));
    let mut reporter = CollectingReporter::new();
    let outcome = lox.run(source, &mut reporter);
    TestRun {
        outcome,
        output: output.lines(),
        reporter,
    }
}
