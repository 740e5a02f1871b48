use {
    crate::{checker::LinearizationInfo, EventKind, Model, Value},
    serde::Serialize,
    std::{
        collections::HashMap,
        fs::File,
        io::{self, BufWriter, Write},
        path::Path,
    },
    tracing::debug,
};

#[derive(Clone, Debug, Default, Serialize)]
struct HistoryElement {
    client_id: usize,
    start: i64,
    end: i64,
    description: String,
}

#[derive(Clone, Debug, Serialize)]
struct LinearizationStep {
    index: usize,
    state_description: String,
}

#[derive(Debug, Serialize)]
struct PartitionData {
    history: Vec<HistoryElement>,
    partial_linearizations: Vec<Vec<LinearizationStep>>,
    /// Operation id to the index of the longest partial linearization that contains it.
    largest: HashMap<usize, usize>,
}

#[derive(Debug, Serialize)]
struct VisualizationData {
    initial_state: String,
    partitions: Vec<PartitionData>,
}

fn compute_visualization_data(model: &Model, info: &LinearizationInfo) -> VisualizationData {
    let initial_state = model.describe_state_of(&model.init());
    let mut partitions = Vec::with_capacity(info.history.len());
    for (partition, history) in info.history.iter().enumerate() {
        let n = history.len() / 2;
        let mut calls: HashMap<usize, &Value> = HashMap::new();
        let mut returns: HashMap<usize, &Value> = HashMap::new();
        for entry in history {
            match entry.kind {
                EventKind::Call => calls.insert(entry.id, &entry.value),
                EventKind::Return => returns.insert(entry.id, &entry.value),
            };
        }

        let mut elements = vec![HistoryElement::default(); n];
        for entry in history {
            let element = &mut elements[entry.id];
            match entry.kind {
                EventKind::Call => {
                    element.client_id = entry.client_id;
                    element.start = entry.time;
                }
                EventKind::Return => {
                    element.end = entry.time;
                    element.description =
                        model.describe_operation_of(calls[&entry.id], returns[&entry.id]);
                }
            }
        }

        let mut largest = HashMap::new();
        let mut largest_size: HashMap<usize, usize> = HashMap::new();
        let mut linearizations = Vec::new();
        for (i, partial) in info.partial_linearizations[partition].iter().enumerate() {
            let mut state = model.init();
            let mut steps = Vec::with_capacity(partial.len());
            for &id in partial {
                let (ok, next) = model.step(&state, calls[&id], returns[&id]);
                assert!(ok, "model step is not pure: operation {id} no longer applies");
                state = next;
                steps.push(LinearizationStep {
                    index: id,
                    state_description: model.describe_state_of(&state),
                });
                let size = largest_size.entry(id).or_default();
                if *size < partial.len() {
                    *size = partial.len();
                    largest.insert(id, i);
                }
            }
            linearizations.push(steps);
        }

        partitions.push(PartitionData {
            history: elements,
            partial_linearizations: linearizations,
            largest,
        });
    }
    VisualizationData {
        initial_state,
        partitions,
    }
}

/// Writes an HTML document visualizing a history and its (partial) linearizations.
///
/// A linearizable partition is shown with its linearization. Otherwise the longest partial
/// linearizations are shown, which point at the operations that could not be linearized. The
/// [`LinearizationInfo`] comes from a verbose check such as
/// [`check_operations_verbose`](crate::check_operations_verbose).
///
/// Errors from `output` are returned unchanged.
///
/// # Panics
///
/// If replaying a partial linearization through the model fails, meaning the model's `step`
/// is not a pure function.
pub fn visualize(model: &Model, info: &LinearizationInfo, mut output: impl Write) -> io::Result<()> {
    let data = compute_visualization_data(model, info);
    debug!(partitions = data.partitions.len(), "rendering visualization");
    // `</` would close the enclosing script element.
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");
    output.write_all(HTML_HEAD.as_bytes())?;
    output.write_all(json.as_bytes())?;
    output.write_all(HTML_TAIL.as_bytes())?;
    output.flush()
}

/// Like [`visualize`], but writes to a file, creating or truncating it.
pub fn visualize_path(
    model: &Model,
    info: &LinearizationInfo,
    path: impl AsRef<Path>,
) -> io::Result<()> {
    let file = File::create(path)?;
    visualize(model, info, BufWriter::new(file))
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Linearizability</title>
<style>
body { font-family: sans-serif; margin: 1em; }
.partition { margin-bottom: 2em; }
.timeline { position: relative; border-left: 1px solid #888; }
.row { position: relative; height: 28px; border-bottom: 1px dotted #ccc; }
.op { position: absolute; height: 20px; top: 4px; background: #cde; border: 1px solid #579;
      font-size: 11px; overflow: hidden; white-space: nowrap; cursor: default; }
.op.linearized { background: #bdb; border-color: #585; }
.op.illegal { background: #ebb; border-color: #955; }
ol { font-family: monospace; }
</style>
</head>
<body>
<h1>Linearizability</h1>
<div id="root"></div>
<script>
const data = "#;

const HTML_TAIL: &str = r#";
const root = document.getElementById("root");
const initial = document.createElement("p");
initial.textContent = "Initial state: " + data.initial_state;
root.appendChild(initial);
data.partitions.forEach((partition, p) => {
  const section = document.createElement("div");
  section.className = "partition";
  const title = document.createElement("h2");
  title.textContent = "Partition " + p;
  section.appendChild(title);
  const ops = partition.history;
  const best = partition.partial_linearizations.reduce(
    (a, b) => (b.length > a.length ? b : a), []);
  const complete = best.length === ops.length;
  const linearized = new Set(best.map(s => s.index));
  const min = Math.min(...ops.map(o => o.start));
  const max = Math.max(...ops.map(o => o.end));
  const scale = 800 / Math.max(1, max - min);
  const clients = Math.max(0, ...ops.map(o => o.client_id)) + 1;
  const timeline = document.createElement("div");
  timeline.className = "timeline";
  const rows = [];
  for (let c = 0; c < clients; c++) {
    const row = document.createElement("div");
    row.className = "row";
    rows.push(row);
    timeline.appendChild(row);
  }
  ops.forEach((op, i) => {
    const el = document.createElement("div");
    el.className = "op " + (linearized.has(i) ? "linearized" : (complete ? "" : "illegal"));
    el.style.left = ((op.start - min) * scale) + "px";
    el.style.width = Math.max(4, (op.end - op.start) * scale) + "px";
    el.textContent = op.description;
    el.title = op.description;
    rows[op.client_id].appendChild(el);
  });
  section.appendChild(timeline);
  const heading = document.createElement("h3");
  heading.textContent = complete ? "Linearization" : "Longest partial linearization";
  section.appendChild(heading);
  const list = document.createElement("ol");
  best.forEach(step => {
    const item = document.createElement("li");
    item.textContent = ops[step.index].description + "  =>  " + step.state_description;
    list.appendChild(item);
  });
  section.appendChild(list);
  root.appendChild(section);
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod test {
    use {super::*, crate::checker::Entry};

    #[test]
    fn computes_descriptions_and_largest() {
        let model = Model::new(
            || Value::new(0i32),
            |_state, input, _output| (true, input.clone()),
        )
        .describe_operation(|input, _output| format!("write({input:?})"));
        let entry = |kind, id, value: i32, time| Entry {
            kind,
            value: Value::new(value),
            id,
            time,
            client_id: id,
        };
        let info = LinearizationInfo {
            history: vec![vec![
                entry(EventKind::Call, 0, 1, 0),
                entry(EventKind::Call, 1, 2, 1),
                entry(EventKind::Return, 0, 0, 2),
                entry(EventKind::Return, 1, 0, 3),
            ]],
            partial_linearizations: vec![vec![vec![1, 0]]],
        };
        let data = compute_visualization_data(&model, &info);
        assert_eq!(data.initial_state, "0");
        let partition = &data.partitions[0];
        assert_eq!(partition.history[1].description, "write(2)");
        assert_eq!(partition.history[1].start, 1);
        assert_eq!(partition.history[1].end, 3);
        assert_eq!(partition.partial_linearizations[0][1].state_description, "1");
        assert_eq!(partition.largest.get(&0), Some(&0));
    }
}
