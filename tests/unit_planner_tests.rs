//! # Planner and OOM Search Unit Tests / 执行计划与 OOM 搜索单元测试
//!
//! Group selection, sharding across runners and the batch size search.
//!
//! 测试组选择、多运行器分片以及批大小搜索。

mod common;

use bench_harness::config::{TestGroup, build_suite};
use bench_harness::core::oom::{check_oom, oom_batch_size_search};
use bench_harness::core::planner::{matches_selector, plan_execution};
use common::{mapping, setup_i18n};

fn groups(ids: &[&str]) -> Vec<TestGroup> {
    let entries: String = ids
        .iter()
        .map(|id| format!("  - test_id: {id}\n    repeat: 2\n"))
        .collect();
    build_suite(&mapping(&format!("run_configs:\n{entries}"))).unwrap()
}

fn ids(groups: &[TestGroup]) -> Vec<&str> {
    groups.iter().map(|g| g.test_id.as_str()).collect()
}

#[cfg(test)]
mod selector_tests {
    use super::*;

    #[test]
    fn test_exact_prefix_suffix_and_contains() {
        assert!(matches_selector("resnet50.gpu_1.32", "resnet50.gpu_1.32"));
        assert!(!matches_selector("resnet50.gpu_1.32", "resnet50"));
        assert!(matches_selector("resnet50.gpu_1.32", "resnet50*"));
        assert!(matches_selector("resnet50.gpu_1.32", "*.32"));
        assert!(!matches_selector("resnet50.gpu_1.32", "*.64"));
        assert!(matches_selector("resnet50.gpu_1.32", "*gpu_1*"));
        assert!(matches_selector("anything", "*"));
    }
}

#[cfg(test)]
mod plan_tests {
    use super::*;

    #[test]
    fn test_everything_runs_without_selectors() {
        setup_i18n();
        let plan = plan_execution(groups(&["a", "b", "c"]), &[], None, None).unwrap();
        assert_eq!(ids(&plan.groups), vec!["a", "b", "c"]);
        assert_eq!(plan.filtered_count, 0);
        assert_eq!(plan.total_copies, 6);
        assert!(!plan.is_distributed);
    }

    #[test]
    fn test_selectors_keep_suite_order() {
        setup_i18n();
        let selectors = vec!["vgg*".to_string(), "resnet50.fp16".to_string()];
        let plan = plan_execution(
            groups(&["resnet50.fp16", "alexnet", "vgg16", "resnet50"]),
            &selectors,
            None,
            None,
        )
        .unwrap();
        assert_eq!(ids(&plan.groups), vec!["resnet50.fp16", "vgg16"]);
        assert_eq!(plan.filtered_count, 2);
    }

    #[test]
    fn test_groups_are_sharded_round_robin() {
        setup_i18n();
        let all = ["g0", "g1", "g2", "g3", "g4"];
        let first = plan_execution(groups(&all), &[], Some(2), Some(0)).unwrap();
        let second = plan_execution(groups(&all), &[], Some(2), Some(1)).unwrap();
        assert_eq!(ids(&first.groups), vec!["g0", "g2", "g4"]);
        assert_eq!(ids(&second.groups), vec!["g1", "g3"]);
        assert!(first.is_distributed);
        assert_eq!(second.total_copies, 4);
    }

    #[test]
    fn test_runner_flags_must_be_complete_and_in_range() {
        setup_i18n();
        let err = plan_execution(groups(&["a"]), &[], Some(2), None).unwrap_err();
        assert!(err.to_string().contains("--total-runners"));
        assert!(plan_execution(groups(&["a"]), &[], Some(2), Some(2)).is_err());
        assert!(plan_execution(groups(&["a"]), &[], Some(0), Some(0)).is_err());
    }
}

#[cfg(test)]
mod oom_tests {
    use super::*;

    #[test]
    fn test_oom_lines_are_detected() {
        assert!(check_oom(
            "ResourceExhaustedError: OOM when allocating tensor with shape[256,64,112,112]"
        ));
        assert!(check_oom("RuntimeError: CUDA out of memory. Tried to allocate 2.00 GiB"));
        assert!(!check_oom("total images/sec: 221.40"));
    }

    #[test]
    fn test_single_step_moves_the_window() {
        let step = oom_batch_size_search(1, 256, 256, true);
        assert_eq!((step.low, step.high, step.next), (1, 256, Some(129)));

        let step = oom_batch_size_search(65, 129, 65, false);
        assert_eq!((step.low, step.high, step.next), (65, 129, Some(97)));
    }

    #[test]
    fn test_search_converges_on_the_largest_fitting_batch() {
        // Batches of 100 and above run out of memory.
        let (mut low, mut high) = (1, 256);
        let mut next = Some(high);
        let mut probes = 0;
        while let Some(batch_size) = next {
            let step = oom_batch_size_search(low, high, batch_size, batch_size >= 100);
            low = step.low;
            high = step.high;
            next = step.next;
            probes += 1;
            assert!(probes < 20, "search did not converge");
        }
        assert_eq!(low, 99);
        assert_eq!(high, 100);
    }
}
